/// The set of domain suffixes this instance is allowed to read and write.
///
/// An empty set means no restriction. Matching is a plain string suffix
/// check: `host.example.com` matches `example.com` and so does
/// `badexample.com`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneFilter {
    suffixes: Vec<String>,
}

impl ZoneFilter {
    /// Build the filter and hand a one-line description of it to `log`.
    ///
    /// Blank entries are dropped and whitespace trimmed; order is kept since
    /// zone resolution depends on it.
    pub fn new<I, S, F>(suffixes: I, log: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnOnce(&str),
    {
        let filter = Self {
            suffixes: suffixes
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        };
        log(&filter.summary());
        filter
    }

    pub fn matches(&self, name: &str) -> bool {
        self.suffixes.is_empty() || self.suffixes.iter().any(|s| name.ends_with(s.as_str()))
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.suffixes.is_empty() {
            "Creating Synology provider with no kind of domain filters".to_string()
        } else {
            format!(
                "Creating Synology provider with zoneNode filter: '{}'",
                self.suffixes.join(",")
            )
        }
    }
}
