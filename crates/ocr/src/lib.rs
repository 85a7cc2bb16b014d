pub mod hash;
pub mod parser;
pub mod pipeline;
pub mod preprocess;
pub mod rasterize;
pub mod recognizer;
pub mod types;

pub use hash::{sha256_bytes, to_hex};
pub use parser::{match_anchored, match_loose, match_quantity, LineParser, PriceMatch};
pub use pipeline::{discover_inputs, PipelineError, ReceiptPipeline};
pub use preprocess::{prepare_for_ocr, threshold, PreprocessError};
pub use rasterize::{MockRasterizer, PdfRasterizer, Pdftoppm, RasterizeError};
pub use recognizer::{MockRecognizer, OcrEngine, OcrError, TesseractCli};
pub use types::{FileOutcome, InputKind, ScanResult, IMAGE_EXTENSIONS};
