use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};

/// How webhook deliveries prove they come from Notion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WebhookMode {
    /// `x-notion-signature: sha256=<hex HMAC of the raw body>`
    Signature,
    /// `x-notion-webhook-token` equal to the shared secret
    Token,
}

/// Runtime settings, read from flags or the process environment.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Notion integration secret
    #[arg(long, env = "NOTION_API_KEY", hide_env_values = true)]
    pub notion_api_key: Option<String>,

    /// Page rendered at `/`; also the only page whose webhook events count
    #[arg(long, env = "NOTION_PAGE_ID")]
    pub notion_page_id: Option<String>,

    /// Shared secret for webhook verification
    #[arg(long, env = "NOTION_WEBHOOK_VERIFICATION_TOKEN", hide_env_values = true)]
    pub webhook_secret: Option<String>,

    #[arg(long, env = "NOTION_WEBHOOK_MODE", value_enum, default_value_t = WebhookMode::Signature)]
    pub webhook_mode: WebhookMode,
}

impl Settings {
    /// API key and page id, both needed to fetch the page.
    pub fn notion_credentials(&self) -> Result<(&str, &str)> {
        match (self.notion_api_key.as_deref(), self.notion_page_id.as_deref()) {
            (Some(key), Some(page)) if !key.is_empty() && !page.is_empty() => Ok((key, page)),
            _ => Err(anyhow!("NOTION_API_KEY and NOTION_PAGE_ID are required")),
        }
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret.as_deref().filter(|s| !s.is_empty())
    }
}
