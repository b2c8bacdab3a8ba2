use crate::ttl::TtlSettings;
use typed_builder::TypedBuilder;
use viplink_generator::AllocatorSettings;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Everything a [`ShortLinkService`](crate::ShortLinkService) is tuned with.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerSettings {
    /// Prefix of every public short URL, e.g. `https://vip.ln`.
    #[builder(default = DEFAULT_BASE_URL.to_string(), setter(into))]
    pub base_url: String,
    #[builder(default)]
    pub allocator: AllocatorSettings,
    #[builder(default)]
    pub ttl: TtlSettings,
}

impl Default for ShortenerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}
