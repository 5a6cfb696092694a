use crate::app::{ApiReply, ApiRequest, ScreenAction};
use crate::domain::DashboardSummary;

pub const LOAD_ERROR: &str = "Failed to load dashboard";

#[derive(Clone, Debug, Default)]
pub struct DashboardScreen {
    pub stats: Option<DashboardSummary>,
    pub loading: bool,
    pub error: Option<String>,
}

impl DashboardScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_fetch(&mut self) -> ApiRequest {
        self.loading = true;
        self.error = None;
        ApiRequest::DashboardSummary
    }

    pub fn on_reply(&mut self, reply: ApiReply) -> ScreenAction {
        match reply {
            ApiReply::DashboardSummary(Ok(stats)) => {
                self.loading = false;
                self.stats = Some(stats);
            }
            ApiReply::DashboardSummary(Err(_)) => {
                self.loading = false;
                self.error = Some(LOAD_ERROR.to_string());
            }
            _ => {}
        }
        ScreenAction::None
    }
}
