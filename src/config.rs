//! Widget configuration
//!
//! The host page supplies the backend endpoints and company branding;
//! environment variables provide them when embedding in a native shell.

/// Configuration for the widget core
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// GraphQL endpoint for queries and mutations
    pub backend_url: String,
    /// Server-sent-events endpoint for message subscriptions
    pub events_url: String,
    /// File upload endpoint
    pub upload_url: String,
    /// Company name shown while no agent has joined
    pub company_name: String,
    /// Company logo shown while no agent has joined
    pub company_logo_url: Option<String>,
}

impl WidgetConfig {
    pub fn new(
        backend_url: impl Into<String>,
        events_url: impl Into<String>,
        upload_url: impl Into<String>,
    ) -> Self {
        Self {
            backend_url: backend_url.into(),
            events_url: events_url.into(),
            upload_url: upload_url.into(),
            company_name: "Support".to_string(),
            company_logo_url: None,
        }
    }

    /// Read configuration from the environment, with local defaults
    pub fn from_env() -> Self {
        let backend_url = std::env::var("SUPPORTLINE_BACKEND_URL")
            .unwrap_or_else(|_| "http://localhost:4000/graphql".to_string());
        let events_url = std::env::var("SUPPORTLINE_EVENTS_URL")
            .unwrap_or_else(|_| "http://localhost:4000/events".to_string());
        let upload_url = std::env::var("SUPPORTLINE_UPLOAD_URL")
            .unwrap_or_else(|_| "http://localhost:4000/upload".to_string());

        let mut config = Self::new(backend_url, events_url, upload_url);
        if let Ok(name) = std::env::var("SUPPORTLINE_COMPANY_NAME") {
            config.company_name = name;
        }
        config.company_logo_url = std::env::var("SUPPORTLINE_COMPANY_LOGO_URL").ok();
        config
    }

    pub fn with_company(mut self, name: impl Into<String>, logo_url: Option<String>) -> Self {
        self.company_name = name.into();
        self.company_logo_url = logo_url;
        self
    }
}
