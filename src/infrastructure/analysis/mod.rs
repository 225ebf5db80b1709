mod http_analysis_client;
mod mock_analysis_client;

pub use http_analysis_client::HttpAnalysisClient;
pub use mock_analysis_client::MockAnalysisClient;
