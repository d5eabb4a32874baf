// src/export/xspf.rs

//! XSPF playlist file writer.
//!
//! Emits one sequentially numbered `<n>.xspf` file per playlist, with the
//! same field mapping as the reference tool chain: playlist title, creator
//! and annotation, and per track the identifier/location URI, title, artist
//! names joined with ", ", album, duration, track number, and `<meta>`
//! entries carrying the provider URIs and added-by/added-time attribution.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::catalog::PlaylistSnapshot;
use crate::export::{ExportError, Exporter};

const META_BASE: &str = "http://browser.org/xspf/spotify";

pub struct XspfExporter {
    output_dir: PathBuf,
    written: usize,
}

impl XspfExporter {
    /// Create the exporter, making sure the output directory exists.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            written: 0,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl Exporter for XspfExporter {
    fn export(&mut self, snapshot: &PlaylistSnapshot) -> Result<(), ExportError> {
        if !snapshot.is_complete() {
            return Err(ExportError::Incomplete {
                missing: snapshot.missing_tracks(),
                total: snapshot.expected_tracks,
            });
        }

        let path = self.output_dir.join(format!("{}.xspf", self.written));
        fs::write(&path, render(snapshot))?;
        self.written += 1;
        info!(
            playlist = %snapshot.name,
            tracks = snapshot.tracks.len(),
            file = %path.display(),
            "wrote playlist"
        );
        Ok(())
    }
}

fn render(snapshot: &PlaylistSnapshot) -> String {
    let mut out = String::new();
    // fmt::Write into a String is infallible.
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(out, r#"<playlist version="1" xmlns="http://xspf.org/ns/0/">"#);
    let _ = writeln!(out, "  <title>{}</title>", escape(&snapshot.name));
    let _ = writeln!(out, "  <creator>{}</creator>", escape(&snapshot.owner));
    if let Some(description) = &snapshot.description {
        let _ = writeln!(out, "  <annotation>{}</annotation>", escape(description));
    }
    let _ = writeln!(out, "  <trackList>");

    for (index, track) in snapshot.tracks.iter().enumerate() {
        let _ = writeln!(out, "    <track>");
        let _ = writeln!(out, "      <location>{}</location>", escape(&track.uri));
        let _ = writeln!(out, "      <identifier>{}</identifier>", escape(&track.uri));
        let _ = writeln!(out, "      <title>{}</title>", escape(&track.title));
        let artists = track
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "      <creator>{}</creator>", escape(&artists));
        let _ = writeln!(out, "      <album>{}</album>", escape(&track.album.name));
        let _ = writeln!(out, "      <trackNum>{}</trackNum>", index + 1);
        let _ = writeln!(out, "      <duration>{}</duration>", track.duration_ms);
        let _ = writeln!(out, "{}", meta(&format!("{META_BASE}/track"), &track.uri));
        let _ = writeln!(out, "{}", meta(&format!("{META_BASE}/album"), &track.album.uri));
        for artist in &track.artists {
            let _ = writeln!(out, "{}", meta(&format!("{META_BASE}/artist"), &artist.uri));
        }
        let added_by = track.added_by.as_deref().unwrap_or(&snapshot.owner);
        let _ = writeln!(out, "{}", meta(&format!("{META_BASE}/added_by"), added_by));
        let _ = writeln!(
            out,
            "{}",
            meta(&format!("{META_BASE}/added_time"), &track.added_at.to_string())
        );
        let _ = writeln!(out, "    </track>");
    }

    let _ = writeln!(out, "  </trackList>");
    let _ = writeln!(out, "</playlist>");
    out
}

fn meta(rel: &str, value: &str) -> String {
    format!(
        "      <meta rel=\"{}\">{}</meta>",
        escape(rel),
        escape(value)
    )
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AlbumRef, ArtistRef, TrackEntry};

    fn snapshot() -> PlaylistSnapshot {
        PlaylistSnapshot {
            id: "pl1".into(),
            name: "Mixtape & Friends".into(),
            uri: "catalog:playlist:pl1".into(),
            owner: "alice".into(),
            description: Some("late <night> cuts".into()),
            expected_tracks: 1,
            tracks: vec![TrackEntry {
                uri: "catalog:track:t1".into(),
                title: "First & Last".into(),
                duration_ms: 201_000,
                added_at: 1_280_000_000,
                added_by: Some("bob".into()),
                album: AlbumRef {
                    uri: "catalog:album:a1".into(),
                    name: "Debut".into(),
                },
                artists: vec![
                    ArtistRef {
                        uri: "catalog:artist:x1".into(),
                        name: "X".into(),
                    },
                    ArtistRef {
                        uri: "catalog:artist:y1".into(),
                        name: "Y".into(),
                    },
                ],
            }],
        }
    }

    #[test]
    fn renders_escaped_fields_and_joined_artists() {
        let xml = render(&snapshot());
        assert!(xml.contains("<title>Mixtape &amp; Friends</title>"));
        assert!(xml.contains("<annotation>late &lt;night&gt; cuts</annotation>"));
        assert!(xml.contains("<creator>X, Y</creator>"));
        assert!(xml.contains("<trackNum>1</trackNum>"));
        assert!(xml.contains("spotify/added_by\">bob</meta>"));
    }

    #[test]
    fn files_are_numbered_sequentially() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = XspfExporter::new(dir.path()).unwrap();
        exporter.export(&snapshot()).unwrap();
        exporter.export(&snapshot()).unwrap();

        assert!(dir.path().join("0.xspf").exists());
        assert!(dir.path().join("1.xspf").exists());
        assert_eq!(exporter.written(), 2);
    }

    #[test]
    fn incomplete_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = XspfExporter::new(dir.path()).unwrap();
        let mut partial = snapshot();
        partial.expected_tracks = 3;

        let err = exporter.export(&partial).unwrap_err();
        assert!(matches!(
            err,
            ExportError::Incomplete { missing: 2, total: 3 }
        ));
        assert_eq!(exporter.written(), 0);
    }
}
