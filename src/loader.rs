use std::time::Duration;

use crate::error::{ DatasetError, LoadError };
use crate::types::{ DatasetFile, StateVector };

/// Immutable, time-ordered day of state vectors
#[derive(Debug, Clone)]
pub struct Dataset {
    date: String,
    states: Vec<StateVector>,
    malformed: usize,
}

impl Dataset {
    /// Sorts by time. The sort is stable so equal times keep their input order.
    pub fn new(date: impl Into<String>, mut states: Vec<StateVector>) -> Result<Self, DatasetError> {
        let date = date.into();
        if states.is_empty() {
            return Err(DatasetError::Empty { date });
        }
        states.sort_by_key(|s| s.time);

        Ok(Self { date, states, malformed: 0 })
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn min_time(&self) -> i64 {
        self.states.first().map(|s| s.time).unwrap_or_default()
    }

    pub fn max_time(&self) -> i64 {
        self.states.last().map(|s| s.time).unwrap_or_default()
    }

    /// Seconds between first and last record
    pub fn duration(&self) -> i64 {
        self.max_time() - self.min_time()
    }

    /// Number of records dropped at load time
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Records with `from <= time <= to`
    pub fn window(&self, from: f64, to: f64) -> &[StateVector] {
        let lo = self.states.partition_point(|s| (s.time as f64) < from);
        let hi = self.states.partition_point(|s| (s.time as f64) <= to);
        if lo >= hi { &[] } else { &self.states[lo..hi] }
    }
}

/// Decode the dataset payload, skipping records that lack the fields the replay needs
pub fn parse_dataset(text: &str) -> Result<Dataset, DatasetError> {
    let file: DatasetFile = serde_json::from_str(text).map_err(LoadError::from)?;
    let total = file.states.len();

    let mut states = Vec::with_capacity(total);
    let mut malformed = 0;

    for (idx, raw) in file.states.into_iter().enumerate() {
        match serde_json::from_value::<StateVector>(raw) {
            Ok(sv) if is_usable(&sv) => states.push(sv),
            Ok(_) => {
                tracing::trace!("record {} has no usable id or coordinates", idx);
                malformed += 1;
            }
            Err(e) => {
                tracing::trace!("record {} rejected: {}", idx, e);
                malformed += 1;
            }
        }
    }

    if malformed > 0 {
        tracing::warn!("Skipped {} of {} malformed state vectors", malformed, total);
    }

    let mut dataset = Dataset::new(file.date, states)?;
    dataset.malformed = malformed;
    Ok(dataset)
}

fn is_usable(sv: &StateVector) -> bool {
    !sv.icao24.trim().is_empty() && sv.lat.is_finite() && sv.lon.is_finite()
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Loads the dataset from a local file or an http(s) URL
pub struct DatasetLoader {
    client: reqwest::Client,
}

impl DatasetLoader {
    pub fn new(timeout: Duration) -> Result<Self, LoadError> {
        let client = reqwest::Client
            ::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| LoadError::Http { url: String::new(), source })?;

        Ok(Self { client })
    }

    /// Use a preconfigured client (proxy, TLS or timeout settings of the caller)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Single attempt, no retry
    pub async fn load(&self, source: &str) -> Result<Dataset, DatasetError> {
        let text = if is_remote(source) {
            self.fetch(source).await?
        } else {
            tokio::fs::read_to_string(source).await.map_err(|e| LoadError::Io {
                path: source.to_string(),
                source: e,
            })?
        };

        let dataset = parse_dataset(&text)?;
        tracing::debug!(
            "Loaded {} state vectors for {} ({} .. {})",
            dataset.len(),
            dataset.date(),
            dataset.min_time(),
            dataset.max_time()
        );

        Ok(dataset)
    }

    async fn fetch(&self, url: &str) -> Result<String, LoadError> {
        let http_err = |source: reqwest::Error| LoadError::Http { url: url.to_string(), source };

        let resp = self.client.get(url).send().await.map_err(http_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Status { url: url.to_string(), status });
        }

        resp.text().await.map_err(http_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sv(time: i64, id: &str) -> StateVector {
        serde_json
            ::from_value(serde_json::json!({ "time": time, "icao24": id, "lat": 0.0, "lon": 0.0 }))
            .unwrap()
    }

    #[test]
    fn parse_sorts_and_counts_malformed_records() {
        let text =
            r#"{
            "date": "2022-06-27",
            "states": [
                { "time": 300, "icao24": "b", "lat": 1.0, "lon": 1.0 },
                { "time": 100, "icao24": "a", "lat": 2.0, "lon": 2.0, "callsign": "DAL1" },
                { "time": 200, "lat": 3.0, "lon": 3.0 },
                { "time": 250, "icao24": "c", "lat": null, "lon": 3.0 },
                { "time": 260, "icao24": "  ", "lat": 3.0, "lon": 3.0 },
                "garbage",
                { "time": 200, "icao24": "a", "lat": 4.0, "lon": 4.0 }
            ]
        }"#;

        let ds = parse_dataset(text).unwrap();
        assert_eq!(ds.date(), "2022-06-27");
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.malformed(), 4);
        let times: Vec<i64> = ds.states().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![100, 200, 300]);
        assert_eq!(ds.min_time(), 100);
        assert_eq!(ds.max_time(), 300);
        assert_eq!(ds.duration(), 200);
    }

    #[test]
    fn empty_states_are_not_a_load_failure() {
        let err = parse_dataset(r#"{ "date": "2022-06-27", "states": [] }"#).unwrap_err();
        assert!(err.is_empty());

        let err = parse_dataset(r#"{ "date": "d", "states": [ { "time": 1 } ] }"#).unwrap_err();
        assert!(err.is_empty());
    }

    #[test]
    fn wrong_shape_is_a_load_error() {
        let err = parse_dataset(r#"{ "date": "2022-06-27" }"#).unwrap_err();
        assert!(matches!(err, DatasetError::Load(LoadError::Parse(_))));

        let err = parse_dataset("not json").unwrap_err();
        assert!(matches!(err, DatasetError::Load(LoadError::Parse(_))));
    }

    #[test]
    fn stable_sort_keeps_input_order_for_equal_times() {
        let ds = Dataset::new("d", vec![sv(5, "x"), sv(1, "y"), sv(5, "z"), sv(5, "w")]).unwrap();
        let ids: Vec<&str> = ds.states().iter().map(|s| s.entity_id()).collect();
        assert_eq!(ids, vec!["y", "x", "z", "w"]);
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let ds = Dataset::new("d", vec![sv(0, "a"), sv(300, "a"), sv(600, "a"), sv(900, "a")]).unwrap();

        let times = |w: &[StateVector]| w.iter().map(|s| s.time).collect::<Vec<_>>();
        assert_eq!(times(ds.window(300.0, 900.0)), vec![300, 600, 900]);
        assert_eq!(times(ds.window(301.0, 899.5)), vec![600]);
        assert!(ds.window(1000.0, 2000.0).is_empty());
        assert!(ds.window(10.0, 5.0).is_empty());
    }

    #[tokio::test]
    async fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "date": "2022-06-27", "states": [ {{ "time": 7, "icao24": "a", "lat": 1.0, "lon": 2.0 }} ] }}"#
        )
        .unwrap();

        let loader = DatasetLoader::new(Duration::from_secs(1)).unwrap();
        let ds = loader.load(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.states()[0].position().lon, 2.0);
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() {
        let loader = DatasetLoader::new(Duration::from_secs(1)).unwrap();
        let err = loader.load("/nonexistent/states.json").await.unwrap_err();
        assert!(matches!(err, DatasetError::Load(LoadError::Io { .. })));
    }

    //--- remote sources, served by a one-shot local listener

    use tokio::io::{ AsyncReadExt, AsyncWriteExt };
    use tokio::net::TcpListener;

    /// Answers the first request with `status_line` and `body`, returns the URL to fetch
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        });

        format!("http://{}/states.json", addr)
    }

    fn local_loader() -> DatasetLoader {
        let client = reqwest::Client
            ::builder()
            .timeout(Duration::from_secs(5))
            .no_proxy()
            .build()
            .unwrap();
        DatasetLoader::with_client(client)
    }

    #[tokio::test]
    async fn loads_from_url() {
        let url = serve_once(
            "200 OK",
            r#"{ "date": "2022-06-27", "states": [ { "time": 7, "icao24": "a", "lat": 1.0, "lon": 2.0 } ] }"#
        ).await;

        let ds = local_loader().load(&url).await.unwrap();
        assert_eq!(ds.date(), "2022-06-27");
        assert_eq!(ds.len(), 1);
    }

    #[tokio::test]
    async fn non_success_status_is_a_load_error() {
        let url = serve_once("404 Not Found", "{}").await;

        let err = local_loader().load(&url).await.unwrap_err();
        match err {
            DatasetError::Load(LoadError::Status { status, url: failed }) => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
                assert_eq!(failed, url);
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_url_is_a_load_error() {
        // grab a free port, then close it so the connection is refused
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = local_loader().load(&format!("http://{}/states.json", addr)).await.unwrap_err();
        assert!(matches!(err, DatasetError::Load(LoadError::Http { .. })));
    }
}
