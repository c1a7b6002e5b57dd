//! Microsoft Teams message cards (Adaptive Card 1.4) for a user's tracks.

use serde::Serialize;

use crate::fetch::{TrackEntry, TrackSource};

const ADAPTIVE_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";
const ADAPTIVE_CARD_SCHEMA: &str = "http://adaptivecards.io/schemas/adaptive-card.json";
const ADAPTIVE_CARD_VERSION: &str = "1.4";

/// The document posted to the webhook.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MessageCard {
    #[serde(rename = "type")]
    kind: &'static str,
    pub attachments: Vec<Attachment>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    content_type: &'static str,
    content_url: Option<String>,
    pub content: AdaptiveCard,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AdaptiveCard {
    #[serde(rename = "$schema")]
    schema: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    version: &'static str,
    pub body: Vec<Element>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum Element {
    TextBlock(TextBlock),
    Image(CardImage),
    Container(Container),
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub text: String,
    pub wrap: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_subtle: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spacing: Option<&'static str>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardImage {
    pub url: String,
    pub size: &'static str,
    pub alt_text: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub items: Vec<Element>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub separator: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_action: Option<OpenUrl>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OpenUrl {
    #[serde(rename = "type")]
    kind: &'static str,
    pub url: String,
    pub title: String,
}

impl OpenUrl {
    fn new(url: &str) -> OpenUrl {
        OpenUrl {
            kind: "Action.OpenUrl",
            url: url.to_string(),
            title: "Open in Spotify".to_string(),
        }
    }
}

impl MessageCard {
    fn wrap(body: Vec<Element>) -> MessageCard {
        MessageCard {
            kind: "message",
            attachments: vec![Attachment {
                content_type: ADAPTIVE_CARD_CONTENT_TYPE,
                content_url: None,
                content: AdaptiveCard {
                    schema: ADAPTIVE_CARD_SCHEMA,
                    kind: "AdaptiveCard",
                    version: ADAPTIVE_CARD_VERSION,
                    body,
                },
            }],
        }
    }

    pub fn body(&self) -> &[Element] {
        self.attachments
            .first()
            .map(|a| a.content.body.as_slice())
            .unwrap_or_default()
    }
}

fn text(text: impl Into<String>) -> TextBlock {
    TextBlock {
        text: text.into(),
        wrap: true,
        ..Default::default()
    }
}

/// Builds the card for one user. Pure: equal inputs give equal cards.
pub fn format_card(username: &str, source: TrackSource, tracks: &[TrackEntry]) -> MessageCard {
    if tracks.is_empty() {
        return MessageCard::wrap(vec![Element::TextBlock(TextBlock {
            weight: Some("Bolder"),
            color: Some("Attention"),
            ..text(format!("No tracks found for {username}"))
        })]);
    }

    let mut body = vec![Element::TextBlock(TextBlock {
        size: Some("Large"),
        weight: Some("Bolder"),
        ..text(format!(
            "🎵 {username}'s {} {} {}",
            tracks.len(),
            source.label(),
            if tracks.len() == 1 { "track" } else { "tracks" }
        ))
    })];

    if let Some(cover) = &tracks[0].cover_url {
        body.push(Element::Image(CardImage {
            url: cover.clone(),
            size: "Medium",
            alt_text: tracks[0].album.clone(),
        }));
        body.push(Element::TextBlock(TextBlock {
            is_subtle: true,
            spacing: Some("Small"),
            ..text(tracks[0].album.clone())
        }));
    }

    body.extend(
        tracks
            .iter()
            .enumerate()
            .map(|(i, track)| Element::Container(track_block(i + 1, track))),
    );

    MessageCard::wrap(body)
}

fn track_block(rank: usize, track: &TrackEntry) -> Container {
    Container {
        items: vec![
            Element::TextBlock(TextBlock {
                weight: Some("Bolder"),
                ..text(format!("{rank}. {}", track.name))
            }),
            Element::TextBlock(TextBlock {
                spacing: Some("None"),
                ..text(format!("by {}", track.artist))
            }),
            Element::TextBlock(TextBlock {
                is_subtle: true,
                spacing: Some("None"),
                ..text(track.album.clone())
            }),
        ],
        // Adaptive Cards draw the separator above the element.
        separator: rank > 1,
        select_action: track.external_url.as_deref().map(OpenUrl::new),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, cover: Option<&str>, url: Option<&str>) -> TrackEntry {
        TrackEntry {
            id: id.to_string(),
            name: format!("Song {id}"),
            artist: "Artist A, Artist B".to_string(),
            album: format!("Album {id}"),
            popularity: 10,
            external_url: url.map(str::to_string),
            preview_url: None,
            played_at: None,
            cover_url: cover.map(str::to_string),
        }
    }

    fn containers(card: &MessageCard) -> Vec<&Container> {
        card.body()
            .iter()
            .filter_map(|e| match e {
                Element::Container(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_list_yields_single_attention_block() {
        let card = format_card("sune", TrackSource::RecentlyPlayed, &[]);
        assert_eq!(card.body().len(), 1);
        match &card.body()[0] {
            Element::TextBlock(block) => {
                assert_eq!(block.text, "No tracks found for sune");
                assert_eq!(block.color, Some("Attention"));
            }
            other => panic!("unexpected element: {other:?}"),
        }
    }

    #[test]
    fn header_cover_and_tracks_in_order() {
        let tracks = vec![
            entry(
                "A",
                Some("https://i.scdn.co/300"),
                Some("https://open.spotify.com/track/A"),
            ),
            entry("B", None, None),
            entry("C", None, Some("https://open.spotify.com/track/C")),
        ];
        let card = format_card("sune", TrackSource::RecentlyPlayed, &tracks);
        let body = card.body();

        match &body[0] {
            Element::TextBlock(b) => assert_eq!(b.text, "🎵 sune's 3 recently played tracks"),
            other => panic!("unexpected header: {other:?}"),
        }
        assert!(matches!(&body[1], Element::Image(img) if img.url == "https://i.scdn.co/300"));
        assert!(matches!(&body[2], Element::TextBlock(b) if b.text == "Album A"));

        let blocks = containers(&card);
        assert_eq!(blocks.len(), 3);
        for (i, block) in blocks.iter().enumerate() {
            match &block.items[0] {
                Element::TextBlock(b) => {
                    assert_eq!(b.text, format!("{}. {}", i + 1, tracks[i].name))
                }
                other => panic!("unexpected element: {other:?}"),
            }
        }
        assert!(!blocks[0].separator);
        assert!(blocks[1].separator && blocks[2].separator);
        assert_eq!(
            blocks[0].select_action.as_ref().map(|a| a.url.as_str()),
            Some("https://open.spotify.com/track/A")
        );
        assert!(blocks[1].select_action.is_none());
    }

    #[test]
    fn no_cover_means_no_image_block() {
        let card = format_card(
            "sune",
            TrackSource::TopTracks(Default::default()),
            &[entry("A", None, None)],
        );
        assert_eq!(card.body().len(), 2);
        match &card.body()[0] {
            Element::TextBlock(b) => assert_eq!(b.text, "🎵 sune's 1 top track"),
            other => panic!("unexpected header: {other:?}"),
        }
    }

    #[test]
    fn formatting_is_idempotent() {
        let tracks = vec![
            entry("A", Some("https://i.scdn.co/300"), None),
            entry("B", None, None),
        ];
        let first = format_card("sune", TrackSource::RecentlyPlayed, &tracks);
        let second = format_card("sune", TrackSource::RecentlyPlayed, &tracks);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn serializes_to_teams_envelope() {
        let card = format_card(
            "sune",
            TrackSource::RecentlyPlayed,
            &[entry("A", None, Some("https://open.spotify.com/track/A"))],
        );
        let value = serde_json::to_value(&card).unwrap();

        assert_eq!(value["type"], "message");
        let attachment = &value["attachments"][0];
        assert_eq!(attachment["contentType"], ADAPTIVE_CARD_CONTENT_TYPE);
        assert_eq!(attachment["contentUrl"], serde_json::Value::Null);
        assert_eq!(attachment["content"]["type"], "AdaptiveCard");
        assert_eq!(attachment["content"]["$schema"], ADAPTIVE_CARD_SCHEMA);
        assert_eq!(
            attachment["content"]["body"][1],
            json!({
                "type": "Container",
                "items": [
                    {"type": "TextBlock", "text": "1. Song A", "wrap": true, "weight": "Bolder"},
                    {
                        "type": "TextBlock",
                        "text": "by Artist A, Artist B",
                        "wrap": true,
                        "spacing": "None"
                    },
                    {
                        "type": "TextBlock",
                        "text": "Album A",
                        "wrap": true,
                        "isSubtle": true,
                        "spacing": "None"
                    }
                ],
                "selectAction": {
                    "type": "Action.OpenUrl",
                    "url": "https://open.spotify.com/track/A",
                    "title": "Open in Spotify"
                }
            })
        );
    }
}
