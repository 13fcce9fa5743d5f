use async_trait::async_trait;

/// A single capability for turning a reference (path or URL) into raw text.
/// Selection between variants is explicit by source type, never sniffed.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, reference: &str) -> anyhow::Result<String>;
}

pub struct FileTextLoader;

#[async_trait]
impl Loader for FileTextLoader {
    async fn load(&self, reference: &str) -> anyhow::Result<String> {
        let bytes = tokio::fs::read(reference).await?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }
}

pub struct FilePdfLoader;

#[async_trait]
impl Loader for FilePdfLoader {
    async fn load(&self, reference: &str) -> anyhow::Result<String> {
        let reference = reference.to_string();
        tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
            let document = lopdf::Document::load(&reference)?;
            let mut text = String::new();
            for (page_number, _) in document.get_pages() {
                if let Ok(page_text) = document.extract_text(&[page_number]) {
                    text.push_str(&page_text);
                    text.push('\n');
                }
            }
            Ok(text)
        })
        .await?
    }
}

pub struct UrlLoader {
    client: reqwest::Client,
}

impl UrlLoader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for UrlLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Loader for UrlLoader {
    async fn load(&self, reference: &str) -> anyhow::Result<String> {
        let response = self.client.get(reference).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("fetching {reference} returned {}", response.status());
        }
        Ok(response.text().await?)
    }
}

/// Dispatches to the right loader by reference shape: `http(s)://` is a URL,
/// `.pdf` is a PDF, everything else is read as text.
pub fn loader_for(reference: &str) -> Box<dyn Loader> {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        Box::new(UrlLoader::new())
    } else if reference.to_lowercase().ends_with(".pdf") {
        Box::new(FilePdfLoader)
    } else {
        Box::new(FileTextLoader)
    }
}
