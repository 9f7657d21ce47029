use std::{fmt, future::Future, str::FromStr, time::Duration};

use chrono::{DateTime, Local, NaiveDate};
use scraper::Html;

pub const DEFAULT_BASE_URL: &str =
    "https://www.studentenwerk-oberfranken.de/essen/speiseplaene/bayreuth/";

/// Part of every plan link on the operator's site, used to find
/// date-bearing links inside a week page.
pub const PLAN_PATH: &str = "essen/speiseplaene/bayreuth/";

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum MensaType {
    MainCanteen,
    FreshRoom,
}

impl MensaType {
    pub const ALL: [MensaType; 2] = [MensaType::MainCanteen, MensaType::FreshRoom];

    pub fn segment(self) -> &'static str {
        match self {
            MensaType::MainCanteen => "hauptmensa",
            MensaType::FreshRoom => "frischraum",
        }
    }

    /// slot index used by the cache
    pub fn index(self) -> usize {
        match self {
            MensaType::MainCanteen => 0,
            MensaType::FreshRoom => 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown canteen \"{0}\"")]
pub struct UnknownMensa(pub String);

impl FromStr for MensaType {
    type Err = UnknownMensa;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hauptmensa" => Ok(MensaType::MainCanteen),
            "frischraum" => Ok(MensaType::FreshRoom),
            _ => Err(UnknownMensa(s.to_string())),
        }
    }
}

impl fmt::Display for MensaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Granularity of a plan page.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum View { Day, Week }

impl View {
    pub fn segment(self) -> &'static str {
        match self {
            View::Day => "tag",
            View::Week => "woche",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Unparsed plan page as last fetched. Never mutated, the cache swaps
/// whole snapshots.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub mensa: MensaType,
    pub view: View,
    /// date the page was requested for
    pub date: NaiveDate,
    /// `None` for the placeholder held before the first fetch succeeds
    pub fetched_at: Option<DateTime<Local>>,
    body: String,
}

impl Snapshot {
    pub fn new(
        mensa: MensaType, view: View, date: NaiveDate,
        body: impl Into<String>,
    ) -> Self {
        Self { mensa, view, date, fetched_at: Some(Local::now()), body: body.into() }
    }

    pub fn placeholder(mensa: MensaType, view: View, date: NaiveDate) -> Self {
        Self { mensa, view, date, fetched_at: None, body: String::new() }
    }

    pub fn is_placeholder(&self) -> bool { self.fetched_at.is_none() }

    pub fn body(&self) -> &str { &self.body }

    /// `Html` is neither `Send` nor `Sync`, so every extraction parses
    /// its own tree and drops it before returning.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("empty response from {0}")]
    EmptyBody(String),
}

/// Where plan pages come from. One call is one retrieval, retries are
/// up to the caller.
pub trait Source: Send + Sync + 'static {
    fn fetch(
        &self, mensa: MensaType, date: NaiveDate, view: View,
    ) -> impl Future<Output = Result<Snapshot, FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct WebSource {
    client: reqwest::Client,
    base_url: String,
}

impl WebSource {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
        .build()?;

        let mut base_url = base_url.into();
        if !base_url.ends_with('/') { base_url.push('/'); }

        Ok(Self { client, base_url })
    }

    pub fn url(&self, mensa: MensaType, date: NaiveDate, view: View) -> String {
        plan_url(&self.base_url, mensa, date, view)
    }
}

/// `<base>/<variant>/<tag|woche>/<yyyy-MM-dd>.html`, `base` must end with `/`
pub fn plan_url(base: &str, mensa: MensaType, date: NaiveDate, view: View) -> String {
    format!("{base}{mensa}/{view}/{}.html", date.format("%Y-%m-%d"))
}

impl Source for WebSource {
    async fn fetch(
        &self, mensa: MensaType, date: NaiveDate, view: View,
    ) -> Result<Snapshot, FetchError> {
        let url = self.url(mensa, date, view);
        tracing::debug!("fetching {url}");

        let body = self.client.get(&url)
            .send().await?
            .error_for_status()?
        .text().await?;

        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody(url));
        }

        Ok(Snapshot::new(mensa, view, date, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_plan_urls() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
        assert_eq!(
            plan_url(DEFAULT_BASE_URL, MensaType::MainCanteen, date, View::Day),
            "https://www.studentenwerk-oberfranken.de/essen/speiseplaene/bayreuth/hauptmensa/tag/2024-05-07.html",
        );
        assert_eq!(
            plan_url("http://localhost/", MensaType::FreshRoom, date, View::Week),
            "http://localhost/frischraum/woche/2024-05-07.html",
        );
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let source = WebSource::new("http://localhost/plans", Duration::from_secs(1), "test").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(
            source.url(MensaType::FreshRoom, date, View::Day),
            "http://localhost/plans/frischraum/tag/2024-01-02.html",
        );
    }

    #[test]
    fn parses_mensa_segments() {
        for mensa in MensaType::ALL {
            assert_eq!(mensa.segment().parse::<MensaType>().unwrap(), mensa);
        }
        let err = "mensa-fan".parse::<MensaType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown canteen \"mensa-fan\"");
    }

    #[test]
    fn placeholder_has_no_body() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let snapshot = Snapshot::placeholder(MensaType::MainCanteen, View::Week, date);
        assert!(snapshot.is_placeholder());
        assert!(snapshot.body().is_empty());
        assert!(!Snapshot::new(MensaType::MainCanteen, View::Week, date, "<html/>").is_placeholder());
    }

    /// Serves the given raw responses, one connection each.
    async fn serve(responses: &'static [&'static str]) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for response in responses {
                let (mut stream, _) = listener.accept().await.unwrap();

                let mut request = Vec::new();
                let mut buf = [0; 1024];
                while !request.ends_with(b"\r\n\r\n") {
                    let n = stream.read(&mut buf).await.unwrap();
                    if n == 0 { break }
                    request.extend_from_slice(&buf[..n]);
                }

                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
        });

        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn fetch_fails_on_error_status_and_blank_body() {
        let base_url = serve(&[
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            "HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\n \n ",
        ]).await;

        let source = WebSource::new(&base_url, Duration::from_secs(5), "test").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();

        let err = source.fetch(MensaType::MainCanteen, date, View::Day).await.unwrap_err();
        assert!(
            matches!(&err, FetchError::Http(e) if e.status() == Some(reqwest::StatusCode::NOT_FOUND)),
            "{err:?}",
        );

        let err = source.fetch(MensaType::MainCanteen, date, View::Day).await.unwrap_err();
        match err {
            FetchError::EmptyBody(url) => assert_eq!(url, format!("{base_url}hauptmensa/tag/2024-05-07.html")),
            err => panic!("expected empty body, got {err:?}"),
        }
    }
}
