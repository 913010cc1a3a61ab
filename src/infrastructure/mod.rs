pub mod ocr;
pub mod storage;
