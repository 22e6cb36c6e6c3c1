use std::fmt;

use serde::{Serialize, Serializer};

/// Stable identifier of a loaded document: its source location, normalized
/// to forward slashes with `.` and `..` segments collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(location: impl AsRef<str>) -> Self {
        Self(normalize_location(location.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve `location` relative to the directory containing this document.
    /// Absolute paths and URLs are only normalized.
    pub fn resolve(&self, location: &str) -> DocumentId {
        let location = location.replace('\\', "/");
        if location.starts_with('/') || location.contains("://") {
            return DocumentId::new(location);
        }
        match self.0.rfind('/') {
            Some(idx) => DocumentId::new(format!("{}/{}", &self.0[..idx], location)),
            None => DocumentId::new(location),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

fn normalize_location(location: &str) -> String {
    let location = location.replace('\\', "/");
    // Keep `scheme://host` intact; only the path part is collapsed.
    let (prefix, path) = match location.find("://") {
        Some(idx) => {
            let after = idx + 3;
            match location[after..].find('/') {
                Some(slash) => location.split_at(after + slash),
                None => (location.as_str(), ""),
            }
        }
        None => ("", location.as_str()),
    };

    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if !absolute && prefix.is_empty() => parts.push(".."),
                _ => {}
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("{prefix}/{joined}")
    } else {
        format!("{prefix}{joined}")
    }
}

/// Identity of a fragment: a document plus a JSON pointer into it.
///
/// Two fragments with equal canonical pointers are the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalPointer {
    document: DocumentId,
    pointer: String,
}

impl CanonicalPointer {
    pub fn new(document: DocumentId, pointer: impl Into<String>) -> Self {
        let mut pointer = pointer.into();
        while pointer.ends_with('/') {
            pointer.pop();
        }
        Self { document, pointer }
    }

    /// The whole document.
    pub fn root(document: DocumentId) -> Self {
        Self {
            document,
            pointer: String::new(),
        }
    }

    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    /// The JSON pointer part, either empty or starting with `/`.
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// Append one (unescaped) segment.
    pub fn join(&self, segment: impl AsRef<str>) -> Self {
        let escaped = segment.as_ref().replace('~', "~0").replace('/', "~1");
        Self {
            document: self.document.clone(),
            pointer: format!("{}/{}", self.pointer, escaped),
        }
    }

    /// Unescaped pointer segments.
    pub fn segments(&self) -> Vec<String> {
        if self.pointer.is_empty() {
            return Vec::new();
        }
        self.pointer[1..].split('/').map(unescape).collect()
    }

    pub fn last_segment(&self) -> Option<String> {
        self.pointer.rfind('/').map(|idx| unescape(&self.pointer[idx + 1..]))
    }

    pub fn parent(&self) -> Option<Self> {
        let idx = self.pointer.rfind('/')?;
        Some(Self {
            document: self.document.clone(),
            pointer: self.pointer[..idx].to_string(),
        })
    }

    /// True when `other` lies strictly inside this fragment.
    pub fn is_ancestor_of(&self, other: &CanonicalPointer) -> bool {
        self.document == other.document
            && other.pointer.len() > self.pointer.len()
            && other.pointer.starts_with(&self.pointer)
            && other.pointer.as_bytes()[self.pointer.len()] == b'/'
    }
}

impl fmt::Display for CanonicalPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document, self.pointer)
    }
}

impl Serialize for CanonicalPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Parse a `$ref` value found in `current` into a canonical pointer.
///
/// Returns `None` for fragments that are not JSON pointers (plain-name
/// anchors such as `#Pet`) or that contain malformed percent escapes.
pub fn parse_ref(reference: &str, current: &DocumentId) -> Option<CanonicalPointer> {
    let (location, fragment) = match reference.split_once('#') {
        Some((location, fragment)) => (location, fragment),
        None => (reference, ""),
    };
    let document = if location.is_empty() {
        current.clone()
    } else {
        current.resolve(location)
    };
    let fragment = percent_decode(fragment)?;
    if !fragment.is_empty() && !fragment.starts_with('/') {
        return None;
    }
    Some(CanonicalPointer::new(document, fragment))
}

fn percent_decode(input: &str) -> Option<String> {
    if !input.contains('%') {
        return Some(input.to_string());
    }
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
