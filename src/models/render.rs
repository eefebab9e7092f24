use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a page is produced and cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStrategy {
    /// Client-side: the server only hands out a shell
    Csr,
    /// Server-side: fresh fetch on every request
    Ssr,
    /// Static: rendered once, refreshed only by path revalidation
    Ssg,
    /// Incremental static regeneration: cached with a revalidate interval
    Isr,
}

impl RenderStrategy {
    /// Route family the strategy is mounted under, e.g. `/isr_page`
    pub fn route_prefix(&self) -> &'static str {
        match self {
            RenderStrategy::Csr => "/csr_page",
            RenderStrategy::Ssr => "/ssr_page",
            RenderStrategy::Ssg => "/ssg_page",
            RenderStrategy::Isr => "/isr_page",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RenderStrategy::Csr => "CSR",
            RenderStrategy::Ssr => "SSR",
            RenderStrategy::Ssg => "SSG",
            RenderStrategy::Isr => "ISR",
        }
    }

    pub fn page_path(&self, id: &str) -> String {
        format!("{}/{}", self.route_prefix(), id)
    }
}

/// Rendered page output. Markup is left to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderDocument {
    pub mode: RenderStrategy,
    pub page: Value,
    pub blocks: Vec<Value>,
    /// ISO-8601 render time
    pub rendered_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revalidate_secs: Option<u64>,
}

/// Client-side rendering shell: the URLs a browser should call through the proxy
#[derive(Debug, Clone, Serialize)]
pub struct ClientShell {
    pub mode: RenderStrategy,
    pub id: String,
    pub page_url: String,
    pub blocks_url: String,
}
