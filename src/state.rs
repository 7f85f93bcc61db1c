use std::sync::Arc;

use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub allowed_origins: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, allowed_origins: Vec<String>) -> Self {
        AppState {
            pipeline: Arc::new(pipeline),
            allowed_origins: Arc::new(allowed_origins),
        }
    }
}
