use std::fmt::Write;

use super::state::Outcome;

/// Terminal rendering of a finished cycle
pub fn render(outcome: &Outcome) -> String {
    let mut out = String::new();

    match outcome {
        Outcome::Success { song, soundtrack } => {
            let _ = writeln!(
                out,
                "🎶 The song {} by {} is featured on:",
                song.song_title, song.artist
            );

            let _ = writeln!(out, "\n🎬 Movies:");
            write_list(&mut out, &soundtrack.movies);

            let _ = writeln!(out, "\n📺 TV Shows:");
            write_list(&mut out, &soundtrack.tv_shows);
        }
        Outcome::NoMatch { .. } | Outcome::Error { .. } => {
            let _ = writeln!(out, "❌ {}", outcome.message());
        }
    }

    out
}

fn write_list(out: &mut String, entries: &[String]) {
    if entries.is_empty() {
        let _ = writeln!(out, "  (none)");
        return;
    }
    for entry in entries {
        let _ = writeln!(out, "  {}", entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::SoundtrackResult;
    use crate::recognition::IdentifiedSong;

    #[test]
    fn renders_both_lists() {
        let outcome = Outcome::Success {
            song: IdentifiedSong::new(Some("Blinding Lights"), Some("The Weeknd")),
            soundtrack: SoundtrackResult {
                movies: vec!["XYZ".to_string()],
                tv_shows: vec![],
            },
        };

        let text = render(&outcome);
        assert!(text.contains("Blinding Lights by The Weeknd"));
        assert!(text.contains("Movies:\n  XYZ\n"));
        assert!(text.contains("TV Shows:\n  (none)\n"));
    }

    #[test]
    fn renders_failure_message() {
        let text = render(&Outcome::NoMatch { song: None });
        assert_eq!(text, "❌ Could not identify the song.\n");
    }
}
