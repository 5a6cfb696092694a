pub mod ai_tools;
pub mod campaigns;
pub mod customers;
pub mod dashboard;
pub mod segments;

pub use ai_tools::{AiToolsFocus, AiToolsScreen};
pub use campaigns::{CampaignsFocus, CampaignsScreen};
pub use customers::{CustomersFocus, CustomersScreen};
pub use dashboard::DashboardScreen;
pub use segments::{SegmentsFocus, SegmentsScreen};
