/// The component tables that get their own group under `components`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentSection {
    Schemas,
    Responses,
    Parameters,
    RequestBodies,
    Headers,
    PathItems,
}

impl ComponentSection {
    /// Walk and rendering order.
    pub const ALL: [ComponentSection; 6] = [
        Self::Schemas,
        Self::Responses,
        Self::Parameters,
        Self::RequestBodies,
        Self::Headers,
        Self::PathItems,
    ];

    /// The key of this table inside `components`.
    pub fn key(self) -> &'static str {
        match self {
            Self::Schemas => "schemas",
            Self::Responses => "responses",
            Self::Parameters => "parameters",
            Self::RequestBodies => "requestBodies",
            Self::Headers => "headers",
            Self::PathItems => "pathItems",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }
}
