use std::collections::HashMap;
use std::fmt;

/// Top-level status of an NVP call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Success,
    SuccessWithWarning,
    PartialSuccess,
    Failure,
    FailureWithWarning,
    Warning,
}

impl Ack {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Success" => Some(Ack::Success),
            "SuccessWithWarning" => Some(Ack::SuccessWithWarning),
            "PartialSuccess" => Some(Ack::PartialSuccess),
            "Failure" => Some(Ack::Failure),
            "FailureWithWarning" => Some(Ack::FailureWithWarning),
            "Warning" => Some(Ack::Warning),
            _ => None,
        }
    }
}

/// One entry of the `L_ERRORCODE{n}` / `L_SHORTMESSAGE{n}` / `L_LONGMESSAGE{n}` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub code: String,
    pub short_message: Option<String>,
    pub long_message: Option<String>,
}

/// A parsed NVP response: flat, case-sensitive fields as PayPal returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    body: HashMap<String, String>,
}

impl Response {
    /// Parse a form-urlencoded body. A key repeated later in the body wins.
    pub fn parse(body: &str) -> Result<Self, serde_urlencoded::de::Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body)?;
        Ok(pairs.into_iter().collect())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.body.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.body
    }

    pub fn ack(&self) -> Option<Ack> {
        self.get("ACK").and_then(Ack::parse)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.get("CORRELATIONID")
    }

    pub fn is_success(&self) -> bool {
        matches!(self.ack(), Some(Ack::Success | Ack::SuccessWithWarning))
    }

    pub fn is_partial_success(&self) -> bool {
        matches!(self.ack(), Some(Ack::PartialSuccess))
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self.ack(),
            Some(Ack::Failure | Ack::FailureWithWarning | Ack::Warning)
        )
    }

    /// Errors in index order, stopping at the first missing `L_ERRORCODE{n}`.
    pub fn errors(&self) -> Vec<ErrorEntry> {
        (0..)
            .map_while(|index| {
                let code = self.get(&format!("L_ERRORCODE{index}"))?;
                Some(ErrorEntry {
                    code: code.to_string(),
                    short_message: self
                        .get(&format!("L_SHORTMESSAGE{index}"))
                        .map(str::to_string),
                    long_message: self
                        .get(&format!("L_LONGMESSAGE{index}"))
                        .map(str::to_string),
                })
            })
            .collect()
    }

    pub fn first_error_code(&self) -> Option<&str> {
        self.get("L_ERRORCODE0")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Response {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            body: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Diagnostic rendering, meant for logs only.
impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_error() {
            writeln!(f, "Debug-Token: {}", self.correlation_id().unwrap_or_default())?;
            for error in self.errors() {
                writeln!(
                    f,
                    "{}: {} ({})",
                    error.code,
                    error.short_message.as_deref().unwrap_or_default(),
                    error.long_message.as_deref().unwrap_or_default()
                )?;
            }
            return Ok(());
        }

        let mut fields: Vec<_> = self.body.iter().collect();
        fields.sort();
        for (key, value) in fields {
            writeln!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
