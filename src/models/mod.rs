//! Domain models for the test conversion server.

pub mod analysis;
pub mod conversion;
pub mod repository;

// Re-export commonly used types
pub use analysis::{
    AnalyzedFile, AnalyzedTestCase, CodeAnalysisResult, CodePattern, Complexity,
    ConversionResult, ConversionSummary, PrimaryFile, ResourceFile,
};
pub use conversion::{
    ConversionDetailResponse, ConversionId, ConversionJob, ConversionListResponse,
    ConversionStatus, ConversionUpdate, ConversionView, CreateConversionRequest,
    DEFAULT_MODEL_SELECTION, DeployRequest, DeployResponse, FileContentResponse,
    ListConversionsQuery, NewConversion, StackSelection, TransitionError,
};
pub use repository::{
    FileInfo, FileStructure, FileType, RepositoryInfo, RepositoryValidation,
    ValidateRepositoryRequest,
};
