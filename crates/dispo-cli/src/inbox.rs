//! The request inbox polled by `dispo watch`.
//!
//! A request `demande_<id>.json` is answered with `reponse_<id>.txt`. Every
//! request gets a reply, including rejected ones, and is removed once the
//! reply is on disk.

use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use dispo_engine::{answer_request, parse_request, AvailabilityConfig, ResponseFormat};
use tracing::{debug, error, info};

use crate::config::{Config, InboxConfig, RetryConfig};
use crate::source::{fetch_period, CalendarFile, EventSource, Retrying};

const REQUEST_PREFIX: &str = "demande_";
const RESPONSE_PREFIX: &str = "reponse_";
const CALENDAR_PREFIX: &str = "calendrier_";
const CALENDAR_EXTENSIONS: [&str; 2] = ["ics", "json"];

pub struct Inbox {
    dirs: InboxConfig,
    retry: RetryConfig,
    availability: AvailabilityConfig,
    format: ResponseFormat,
}

impl Inbox {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            dirs: config.inbox.clone(),
            retry: config.retry.clone(),
            availability: config.availability()?,
            format: config.response_format(),
        })
    }

    /// Poll until killed, or scan once when `once` is set.
    pub fn run(&self, once: bool) {
        info!(
            requests = %self.dirs.requests_dir.display(),
            responses = %self.dirs.responses_dir.display(),
            "watching for availability requests"
        );
        loop {
            let handled = self.poll();
            if once {
                info!("Handled {} request(s)", handled);
                return;
            }
            thread::sleep(self.dirs.poll_interval());
        }
    }

    /// One polling round. A directory that cannot be listed is logged and
    /// counts as zero requests; the next round tries again.
    pub fn poll(&self) -> usize {
        self.scan().unwrap_or_else(|e| {
            error!("Failed to scan the requests directory: {:#}", e);
            0
        })
    }

    /// Answer every pending request. Returns how many were answered.
    pub fn scan(&self) -> Result<usize> {
        let mut handled = 0;
        for id in self.pending()? {
            match self.handle(&id) {
                Ok(()) => handled += 1,
                Err(e) => error!(request = %id, "Failed to handle request: {:#}", e),
            }
        }
        Ok(handled)
    }

    /// Ids of the request files waiting in the requests directory, sorted.
    fn pending(&self) -> Result<Vec<String>> {
        let dir = &self.dirs.requests_dir;
        if !dir.exists() {
            debug!(dir = %dir.display(), "requests directory does not exist yet");
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to list requests in {}", dir.display()))?;

        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| request_id(&entry.file_name().to_string_lossy()))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn handle(&self, id: &str) -> Result<()> {
        let request_path = self
            .dirs
            .requests_dir
            .join(format!("{}{}.json", REQUEST_PREFIX, id));
        let payload = std::fs::read_to_string(&request_path)
            .with_context(|| format!("Failed to read request: {}", request_path.display()))?;

        let own_calendar = self.own_calendar(id);
        let reply = self.reply(id, &payload, own_calendar.as_deref());

        std::fs::create_dir_all(&self.dirs.responses_dir).with_context(|| {
            format!(
                "Failed to create responses directory: {}",
                self.dirs.responses_dir.display()
            )
        })?;
        let response_path = self
            .dirs
            .responses_dir
            .join(format!("{}{}.txt", RESPONSE_PREFIX, id));
        std::fs::write(&response_path, &reply)
            .with_context(|| format!("Failed to write response: {}", response_path.display()))?;
        info!(request = %id, response = %response_path.display(), "response written");

        remove(&request_path)?;
        if let Some(calendar) = &own_calendar {
            remove(calendar)?;
        }
        Ok(())
    }

    /// The reply text for one request. Never fails: problems become the reply.
    fn reply(&self, id: &str, payload: &str, own_calendar: Option<&Path>) -> String {
        let request = match parse_request(payload) {
            Ok(request) => request,
            Err(e) => {
                error!(request = %id, "Rejected request: {}", e);
                return self.format.render_rejection(&e);
            }
        };

        let calendar = own_calendar
            .map(Path::to_path_buf)
            .or_else(|| self.dirs.default_calendar.clone());
        let Some(calendar) = calendar else {
            error!(request = %id, "No calendar available");
            return self.format.render_error(&format!(
                "no calendar found for request {} in {}",
                id,
                self.dirs.calendars_dir.display()
            ));
        };

        let source = Retrying::new(CalendarFile::open(calendar), &self.retry);
        let (start, end) = fetch_period(&request, self.availability.timezone);
        let events = match source.fetch_events(start, end) {
            Ok(events) => events,
            Err(e) => {
                error!(request = %id, "Failed to fetch events: {}", e);
                return self.format.render_error(&e);
            }
        };
        debug!(request = %id, events = events.len(), "events fetched");

        answer_request(&events, &request, &self.availability, &self.format)
            .unwrap_or_else(|e| self.format.render_rejection(&e))
    }

    /// The request's own calendar file, `.ics` preferred over `.json`.
    fn own_calendar(&self, id: &str) -> Option<PathBuf> {
        CALENDAR_EXTENSIONS
            .iter()
            .map(|ext| {
                self.dirs
                    .calendars_dir
                    .join(format!("{}{}.{}", CALENDAR_PREFIX, id, ext))
            })
            .find(|path| path.exists())
    }
}

/// `demande_42.json` -> `42`.
fn request_id(file_name: &str) -> Option<String> {
    file_name
        .strip_prefix(REQUEST_PREFIX)?
        .strip_suffix(".json")
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn remove(path: &Path) -> Result<()> {
    std::fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EVENTS: &str = r#"[
        {"start": "2026-03-02T10:00:00", "end": "2026-03-02T11:00:00", "subject": "Standup"}
    ]"#;

    const EVENTS_ICS: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
PRODID:-//dispo//tests//FR\r
BEGIN:VEVENT\r
UID:revue@dispo\r
DTSTAMP:20260201T000000Z\r
DTSTART;TZID=Europe/Paris:20260302T093000\r
DTEND;TZID=Europe/Paris:20260302T110000\r
SUMMARY:Revue\r
END:VEVENT\r
END:VCALENDAR\r
";

    const REQUEST: &str = r#"{
        "date": "2026-03-02",
        "date_1": "2026-03-02",
        "duree": "1",
        "heureDebutTravail": "09:00",
        "heureFinTravail": "12:00"
    }"#;

    /// A fresh inbox layout, removed when the returned directory is dropped.
    fn layout() -> (TempDir, Config) {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("in")).unwrap();
        std::fs::create_dir_all(root.path().join("cal")).unwrap();

        let mut config = Config::default();
        config.inbox.requests_dir = root.path().join("in");
        config.inbox.responses_dir = root.path().join("out");
        config.inbox.calendars_dir = root.path().join("cal");
        config.retry.initial_delay_ms = 0;
        (root, config)
    }

    #[test]
    fn request_ids_come_from_file_names() {
        assert_eq!(request_id("demande_42.json"), Some("42".to_string()));
        assert_eq!(request_id("demande_.json"), None);
        assert_eq!(request_id("demande_42.txt"), None);
        assert_eq!(request_id("notes.json"), None);
    }

    #[test]
    fn answers_and_cleans_up_a_request() {
        let (root, config) = layout();
        let root = root.path();
        std::fs::write(root.join("in/demande_7.json"), REQUEST).unwrap();
        std::fs::write(root.join("cal/calendrier_7.json"), EVENTS).unwrap();

        let handled = Inbox::new(&config).unwrap().scan().unwrap();

        assert_eq!(handled, 1);
        let reply = std::fs::read_to_string(root.join("out/reponse_7.txt")).unwrap();
        let lines: Vec<&str> = reply.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "lundi 02/03/2026 de 09:00 à 10:00");
        assert_eq!(lines[2], "lundi 02/03/2026 de 11:00 à 12:00");
        assert!(!root.join("in/demande_7.json").exists());
        assert!(!root.join("cal/calendrier_7.json").exists());
    }

    #[test]
    fn ics_calendar_is_preferred_and_removed() {
        let (root, config) = layout();
        let root = root.path();
        std::fs::write(root.join("in/demande_11.json"), REQUEST).unwrap();
        std::fs::write(root.join("cal/calendrier_11.ics"), EVENTS_ICS).unwrap();
        std::fs::write(root.join("cal/calendrier_11.json"), "[]").unwrap();

        Inbox::new(&config).unwrap().scan().unwrap();

        let reply = std::fs::read_to_string(root.join("out/reponse_11.txt")).unwrap();
        let lines: Vec<&str> = reply.lines().collect();
        assert_eq!(lines[1..], ["lundi 02/03/2026 de 11:00 à 12:00"]);
        assert!(!root.join("cal/calendrier_11.ics").exists());
        assert!(root.join("cal/calendrier_11.json").exists());
    }

    #[test]
    fn invalid_request_gets_a_rejection() {
        let (root, config) = layout();
        let root = root.path();
        std::fs::write(
            root.join("in/demande_8.json"),
            r#"{"date": "2026-03-05", "date_1": "2026-03-02", "duree": "1"}"#,
        )
        .unwrap();

        Inbox::new(&config).unwrap().scan().unwrap();

        let reply = std::fs::read_to_string(root.join("out/reponse_8.txt")).unwrap();
        assert!(reply.starts_with("Demande invalide"));
        assert!(reply.contains("date_1"));
        assert!(!root.join("in/demande_8.json").exists());
    }

    #[test]
    fn falls_back_to_the_default_calendar() {
        let (root, mut config) = layout();
        let root = root.path();
        std::fs::write(root.join("shared.json"), EVENTS).unwrap();
        config.inbox.default_calendar = Some(root.join("shared.json"));
        std::fs::write(root.join("in/demande_9.json"), REQUEST).unwrap();

        Inbox::new(&config).unwrap().scan().unwrap();

        let reply = std::fs::read_to_string(root.join("out/reponse_9.txt")).unwrap();
        assert_eq!(reply.lines().count(), 3);
        assert!(root.join("shared.json").exists());
    }

    #[test]
    fn missing_calendar_is_reported_in_the_reply() {
        let (root, config) = layout();
        let root = root.path();
        std::fs::write(root.join("in/demande_10.json"), REQUEST).unwrap();

        Inbox::new(&config).unwrap().scan().unwrap();

        let reply = std::fs::read_to_string(root.join("out/reponse_10.txt")).unwrap();
        assert!(reply.starts_with("Erreur lors de la recherche des disponibilités"));
    }

    #[test]
    fn unreadable_requests_directory_does_not_stop_polling() {
        let (root, mut config) = layout();
        let root = root.path();
        // A plain file where the directory should be: listing fails.
        let requests = root.join("requests");
        std::fs::write(&requests, "not a directory").unwrap();
        config.inbox.requests_dir = requests.clone();
        let inbox = Inbox::new(&config).unwrap();

        assert!(inbox.scan().is_err());
        assert_eq!(inbox.poll(), 0);

        std::fs::remove_file(&requests).unwrap();
        std::fs::create_dir_all(&requests).unwrap();
        std::fs::write(requests.join("demande_12.json"), REQUEST).unwrap();
        std::fs::write(root.join("cal/calendrier_12.json"), EVENTS).unwrap();

        assert_eq!(inbox.poll(), 1);
        assert!(root.join("out/reponse_12.txt").exists());
    }
}
