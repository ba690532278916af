use serde::{Deserialize, Serialize};

/// Response of the free-token endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FreeToken {
    /// The bearer token to use for queries.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Token type as reported by the auth service, usually `"bearer"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl FreeToken {
    /// Returns the access token if it is present and non-empty.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_with_token() {
        let token: FreeToken =
            serde_json::from_str(r#"{"access_token":"abc","token_type":"bearer"}"#).unwrap();
        assert_eq!(token.access_token(), Some("abc"));
        assert_eq!(token.token_type.as_deref(), Some("bearer"));
    }

    #[test]
    fn missing_or_empty_token() {
        let missing: FreeToken = serde_json::from_str(r#"{"detail":"nope"}"#).unwrap();
        assert_eq!(missing.access_token(), None);

        let empty: FreeToken = serde_json::from_str(r#"{"access_token":""}"#).unwrap();
        assert_eq!(empty.access_token(), None);
    }
}
