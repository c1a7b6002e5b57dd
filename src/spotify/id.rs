use std::marker::PhantomData;
use std::sync::LazyLock;

use regex::Regex;

pub type TrackId = GenericResourceIdentifier<Track>;
pub type UserId = GenericResourceIdentifier<User>;

static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z]{22}$").expect("valid id regex"));
static URI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^spotify:(track|user):([0-9A-Za-z_.\-]+)$").expect("valid uri regex")
});
static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://open\.spotify\.com/(track|user)/([0-9A-Za-z_.\-]+)(\?si=[0-9A-Za-z]+)?$")
        .expect("valid url regex")
});

pub trait ResourceTypes {
    const NAME: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Track;
impl ResourceTypes for Track {
    const NAME: &'static str = "track";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct User;
impl ResourceTypes for User {
    const NAME: &'static str = "user";
}

/// A bare Spotify id, parsed from an id, a `spotify:` uri or an
/// `open.spotify.com` url of the matching resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericResourceIdentifier<R>
where
    R: ResourceTypes,
{
    id: String,
    resource_type: PhantomData<R>,
}

impl<R: ResourceTypes> GenericResourceIdentifier<R> {
    pub fn new(identifier: &str) -> Option<GenericResourceIdentifier<R>> {
        let id = if ID_REGEX.is_match(identifier) {
            identifier.to_string()
        } else {
            let captures = URI_REGEX
                .captures(identifier)
                .or_else(|| URL_REGEX.captures(identifier))?;
            if &captures[1] != R::NAME {
                return None;
            }
            captures[2].to_string()
        };

        Some(GenericResourceIdentifier {
            id,
            resource_type: PhantomData,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn uri(&self) -> String {
        format!("spotify:{}:{}", R::NAME, self.id)
    }

    pub fn url(&self) -> String {
        format!("https://open.spotify.com/{}/{}", R::NAME, self.id)
    }
}
