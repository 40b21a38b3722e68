use crate::shared::constants::COCO_CLASSES;

/// Index-to-label table for a detection model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// The 80 COCO classes that stock YOLOv8 weights are trained on.
    pub fn coco() -> Self {
        Self::new(COCO_CLASSES.iter().map(|s| s.to_string()).collect())
    }

    /// Parses the `names` entry that Ultralytics writes into exported ONNX
    /// metadata, e.g. `{0: 'person', 1: 'bicycle'}`.
    ///
    /// Returns `None` if the string is not a dict literal or the indices are
    /// not contiguous from zero.
    pub fn from_metadata(raw: &str) -> Option<Self> {
        let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
        let mut entries: Vec<(usize, String)> = Vec::new();

        for entry in split_entries(body) {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (key, value) = entry.split_once(':')?;
            let index: usize = key.trim().parse().ok()?;
            let name = unquote(value.trim())?;
            entries.push((index, name.to_string()));
        }

        if entries.is_empty() {
            return None;
        }
        entries.sort_by_key(|(i, _)| *i);
        if entries.iter().enumerate().any(|(pos, (i, _))| pos != *i) {
            return None;
        }
        Some(Self::new(entries.into_iter().map(|(_, n)| n).collect()))
    }

    pub fn count(&self) -> usize {
        self.names.len()
    }

    /// Label for `class_id`; unknown ids become `class<N>`.
    pub fn label(&self, class_id: usize) -> String {
        self.names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class{class_id}"))
    }
}

/// Splits on commas that are not inside a quoted name.
fn split_entries(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ',') => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

fn unquote(s: &str) -> Option<&str> {
    let first = s.chars().next()?;
    if (first == '\'' || first == '"') && s.len() >= 2 && s.ends_with(first) {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}
