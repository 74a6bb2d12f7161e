//! # Filename Codec
//!
//! Maps playlist tracks to canonical library filenames and back.
//!
//! A library file is named `"{position} - {title}.mp3"` where `title` has
//! path-hostile characters removed. The part after the position prefix is the
//! track's *content key*: it identifies a song independently of where it sits
//! in the playlist, so a track that moved only needs a rename.
//!
//! ```
//! use core_sync::codec::{decode, sanitize};
//!
//! assert_eq!(sanitize("AC/DC: Live?"), "ACDC Live");
//!
//! let decoded = decode("12 - Hello.mp3").unwrap();
//! assert_eq!(decoded.position, 12);
//! assert_eq!(decoded.content_key, "Hello");
//! ```

use bridge_traits::playlist::PlaylistTrack;

/// Extension of every managed library file.
pub const AUDIO_EXTENSION: &str = ".mp3";

/// Separator between position prefix and content key.
pub const POSITION_SEPARATOR: &str = " - ";

const FORBIDDEN: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Removes characters that are invalid in filenames on common filesystems,
/// trims surrounding whitespace, then strips trailing spaces and dots.
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| !FORBIDDEN.contains(c)).collect();
    cleaned
        .trim()
        .trim_end_matches([' ', '.'])
        .to_string()
}

/// Position-independent identity of a track.
pub fn content_key(track: &PlaylistTrack) -> String {
    sanitize(&track.title)
}

/// Canonical library filename of a track.
pub fn encode(track: &PlaylistTrack) -> String {
    format!(
        "{}{}{}{}",
        track.position,
        POSITION_SEPARATOR,
        content_key(track),
        AUDIO_EXTENSION
    )
}

/// Downloader search query for a track.
pub fn search_query(track: &PlaylistTrack) -> String {
    format!("{} by {} audio", track.title, track.primary_artist())
}

/// A managed filename split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedName {
    pub position: u32,
    pub content_key: String,
}

/// Splits `"{digits} - {rest}"`; `None` for names the bot does not manage.
///
/// The content key is `rest` with one trailing `.mp3` removed, so partial
/// downloads such as `"4 - X.mp3.part"` keep a key that matches no track.
pub fn decode(filename: &str) -> Option<DecodedName> {
    let (prefix, rest) = filename.split_once(POSITION_SEPARATOR)?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let position = prefix.parse().ok()?;
    let content_key = rest.strip_suffix(AUDIO_EXTENSION).unwrap_or(rest);

    Some(DecodedName {
        position,
        content_key: content_key.to_string(),
    })
}

/// Position prefix of a managed filename.
pub fn position_of(filename: &str) -> Option<u32> {
    decode(filename).map(|decoded| decoded.position)
}

/// Whether `filename` looks like a playable library file.
pub fn is_audio_file(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(AUDIO_EXTENSION)
}

/// Display name of a library file: the filename without its extension.
pub fn display_stem(filename: &str) -> &str {
    filename.strip_suffix(AUDIO_EXTENSION).unwrap_or(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, position: u32) -> PlaylistTrack {
        PlaylistTrack {
            title: title.to_string(),
            artists: vec!["Artist".to_string()],
            duration_ms: 180_000,
            album_art_url: None,
            added_by: None,
            position,
        }
    }

    #[test]
    fn test_sanitize_removes_forbidden_characters() {
        assert_eq!(sanitize(r#"a\b/c*d?e:f"g<h>i|j"#), "abcdefghij");
    }

    #[test]
    fn test_sanitize_trims_trailing_dots_and_spaces() {
        assert_eq!(sanitize("  Hello World  "), "Hello World");
        assert_eq!(sanitize("Wait..."), "Wait");
        assert_eq!(sanitize("Why? . ."), "Why");
        assert_eq!(sanitize("Mr. Blue Sky"), "Mr. Blue Sky");
        assert_eq!(sanitize("???"), "");
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(&track("Song A", 1)), "1 - Song A.mp3");
        assert_eq!(encode(&track("What's Up?", 42)), "42 - What's Up.mp3");
    }

    #[test]
    fn test_search_query_uses_primary_artist() {
        let mut t = track("Song", 1);
        t.artists = vec!["First".to_string(), "Second".to_string()];
        assert_eq!(search_query(&t), "Song by First audio");

        t.artists.clear();
        assert_eq!(search_query(&t), "Song by Unknown audio");
    }

    #[test]
    fn test_decode_managed_names() {
        assert_eq!(
            decode("3 - Old Title.mp3"),
            Some(DecodedName {
                position: 3,
                content_key: "Old Title".to_string()
            })
        );
        // Only the first separator splits.
        assert_eq!(decode("7 - A - B.mp3").unwrap().content_key, "A - B");
        assert_eq!(decode("4 - X.mp3.part").unwrap().content_key, "X.mp3.part");
        assert_eq!(decode("5 - Clip.webm").unwrap().content_key, "Clip.webm");
    }

    #[test]
    fn test_decode_rejects_unmanaged_names() {
        assert_eq!(decode("notes.txt"), None);
        assert_eq!(decode("Intro - Theme.mp3"), None);
        assert_eq!(decode(" - Theme.mp3"), None);
        assert_eq!(decode("-3 - Theme.mp3"), None);
        assert_eq!(decode("99999999999 - Overflow.mp3"), None);
    }

    #[test]
    fn test_round_trip_recovers_content_key() {
        for (title, position) in [("Song A", 1), ("Mr. Blue Sky", 12), ("A - B", 300)] {
            let t = track(title, position);
            let decoded = decode(&encode(&t)).unwrap();
            assert_eq!(decoded.content_key, content_key(&t));
            assert_eq!(decoded.position, position);
        }
    }

    #[test]
    fn test_audio_file_helpers() {
        assert!(is_audio_file("1 - A.mp3"));
        assert!(is_audio_file("1 - A.MP3"));
        assert!(!is_audio_file("1 - A.mp3.part"));
        assert_eq!(position_of("9 - A.mp3"), Some(9));
        assert_eq!(position_of("A.mp3"), None);
        assert_eq!(display_stem("9 - A.mp3"), "9 - A");
    }
}
