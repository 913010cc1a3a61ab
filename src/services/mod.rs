pub mod extractor;
pub mod ocr;
pub mod ocr_service;
pub mod storage;
