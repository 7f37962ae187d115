//! Icecast streaming server sink.
//!
//! Updates a mountpoint's song line through the Icecast admin interface:
//! `GET /admin/metadata?mount=...&mode=updinfo&song=...` with basic
//! authentication. Icecast answers 200 even for mounts nobody listens to,
//! so a failure here genuinely means the server is unreachable or the
//! credentials are wrong.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use url::Url;

use crate::{error::Result, http, output::Output, text::StructuredText};

/// An output driving an Icecast mountpoint's metadata.
pub struct IcecastOutput {
    name: String,
    delay: Duration,
    client: Arc<http::Client>,
    server: Url,
    mount: String,
    username: String,
    password: String,
}

impl IcecastOutput {
    /// Creates the output.
    ///
    /// `server` is the root URL of the Icecast instance
    /// (`http://host:8000/`); the admin path is derived from it.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        delay: Duration,
        client: Arc<http::Client>,
        server: Url,
        mount: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            delay,
            client,
            server,
            mount: mount.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Builds the admin URL for one song update.
    fn admin_url(&self, song: &str) -> Result<Url> {
        let mut url = self.server.join("admin/metadata")?;
        url.query_pairs_mut()
            .append_pair("mount", &self.mount)
            .append_pair("mode", "updinfo")
            .append_pair("charset", "UTF-8")
            .append_pair("song", song);
        Ok(url)
    }
}

#[async_trait]
impl Output for IcecastOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "icecast"
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    async fn send(&self, text: &StructuredText) -> Result<()> {
        let url = self.admin_url(&text.to_string())?;
        let request = self
            .client
            .unlimited
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .build()?;

        self.client.execute(request).await?.error_for_status()?;
        debug!("{}: updated mount {}", self.name, self.mount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_url_encodes_the_song() {
        let output = IcecastOutput::new(
            "ice",
            Duration::ZERO,
            Arc::new(http::Client::new().unwrap()),
            Url::parse("http://icecast.local:8000/").unwrap(),
            "/zuidwest.mp3",
            "admin",
            "hackme",
        );

        let url = output.admin_url("Queen - One Vision").unwrap();
        assert_eq!(url.path(), "/admin/metadata");
        let query = url.query().unwrap();
        assert!(query.contains("mount=%2Fzuidwest.mp3"));
        assert!(query.contains("mode=updinfo"));
        assert!(query.contains("song=Queen+-+One+Vision"));
    }
}
