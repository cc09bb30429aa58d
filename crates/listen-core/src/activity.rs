use serde::{Deserialize, Serialize};

/// Body of `GET /api/get-activity`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ActivityFeed {
    #[serde(default)]
    pub friends: Vec<FriendActivity>,
}

/// Body of the listen-along endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ListenStatus {
    pub status: String,
}

/// One friend's latest reported listening event.
///
/// Records are replaced wholesale on every poll; the only identity that
/// survives across polls is `user.uri`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FriendActivity {
    /// Epoch milliseconds, assigned by the server.
    pub timestamp: i64,
    pub user: User,
    pub track: Track,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    pub album: NamedRef,
    pub artist: NamedRef,
    pub context: PlayContext,
}

/// A `{uri, name}` pair (album, artist).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NamedRef {
    pub uri: String,
    pub name: String,
}

/// The playlist, album or artist the track is being played from.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PlayContext {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub index: i64,
}

impl PlayContext {
    pub fn kind(&self) -> ContextKind {
        ContextKind::from_uri(&self.uri)
    }
}

/// Resource type encoded in a context URI (`spotify:<kind>:<id>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextKind {
    Playlist,
    Album,
    Artist,
    #[default]
    Other,
}

impl ContextKind {
    pub fn from_uri(uri: &str) -> Self {
        match uri.split(':').nth(1) {
            Some("playlist") => Self::Playlist,
            Some("album") => Self::Album,
            Some("artist") => Self::Artist,
            _ => Self::Other,
        }
    }

    /// Single-cell glyph for list rows.
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Playlist => "≡",
            Self::Album => "◉",
            Self::Artist => "☻",
            Self::Other => " ",
        }
    }
}

/// Web link for a `spotify:<type>:<id>` URI.
pub fn open_url(uri: &str) -> Option<String> {
    let mut parts = uri.split(':');
    let _scheme = parts.next()?;
    let kind = parts.next().filter(|s| !s.is_empty())?;
    let id = parts.next().filter(|s| !s.is_empty())?;
    Some(format!("https://open.spotify.com/{}/{}", kind, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "friends": [{
            "timestamp": 1700000000000,
            "user": {
                "uri": "spotify:user:alice",
                "name": "Alice",
                "imageUrl": "https://i.scdn.co/image/alice"
            },
            "track": {
                "uri": "spotify:track:4uLU6hMCjMI75M1A2tKUQC",
                "name": "Never Gonna Give You Up",
                "imageUrl": "https://i.scdn.co/image/track",
                "album": { "uri": "spotify:album:6N9PS4QXF1D0OWPk0Sxtb4", "name": "Whenever You Need Somebody" },
                "artist": { "uri": "spotify:artist:0gxyHStUsqpMadRV0Di1Qt", "name": "Rick Astley" },
                "context": { "uri": "spotify:playlist:37i9dQZF1DX", "name": "80s Hits", "index": 3 }
            }
        }]
    }"#;

    #[test]
    fn test_feed_preserves_every_field() {
        let feed: ActivityFeed = serde_json::from_str(SAMPLE).unwrap();
        let back = serde_json::to_value(&feed).unwrap();
        let original: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(back, original);

        let friend = &feed.friends[0];
        assert_eq!(friend.user.image_url, "https://i.scdn.co/image/alice");
        assert_eq!(friend.track.album.name, "Whenever You Need Somebody");
        assert_eq!(friend.track.context.index, 3);
    }

    #[test]
    fn test_missing_image_url_defaults_to_empty() {
        let json = r#"{"uri": "spotify:user:bob", "name": "Bob"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.image_url, "");
    }

    #[test]
    fn test_context_kind_from_uri() {
        assert_eq!(ContextKind::from_uri("spotify:playlist:abc"), ContextKind::Playlist);
        assert_eq!(ContextKind::from_uri("spotify:album:abc"), ContextKind::Album);
        assert_eq!(ContextKind::from_uri("spotify:artist:abc"), ContextKind::Artist);
        assert_eq!(ContextKind::from_uri("spotify:show:abc"), ContextKind::Other);
        assert_eq!(ContextKind::from_uri(""), ContextKind::Other);
    }

    #[test]
    fn test_open_url() {
        assert_eq!(
            open_url("spotify:track:4uLU6hMCjMI75M1A2tKUQC").as_deref(),
            Some("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC")
        );
        assert_eq!(open_url("spotify:user"), None);
        assert_eq!(open_url("not-a-uri"), None);
    }
}
