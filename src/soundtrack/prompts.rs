// Prompt text for the soundtrack source
//
// Both prompts pin the answer to the "Movies:" / "TV Shows:" layout that
// `lookup::parse_soundtrack` reads.

const OUTPUT_FORMAT: &str = "Movies:\nTitle (Year)\n\nTV Shows:\nTitle, SXXEXX (Year)";

/// First pass: ask the model directly
pub fn placements(song_title: &str, artist: &str) -> String {
    format!(
        "List every movie and TV show that used the song '{song_title}' by {artist} in its soundtrack. \
         Give movies with their release year. \
         Give TV shows with season and episode when known, plus the release year. \
         Only include placements you can verify; leave out anything uncertain. \
         Use exactly this format, with a blank line between the two sections:\n{OUTPUT_FORMAT}"
    )
}

/// Web search query for the enrichment pass
pub fn search_query(song_title: &str, artist: &str) -> String {
    format!("Where was the song '{song_title}' by {artist} used in movies and TV shows?")
}

/// Second pass: merge the model's answer with search snippets
pub fn merge(song_title: &str, artist: &str, first_pass: &str, search_results: &[String]) -> String {
    let snippets = if search_results.is_empty() {
        "(no search results)".to_string()
    } else {
        search_results.join("\n")
    };

    format!(
        "These movies and TV shows were listed as using the song '{song_title}' by {artist}:\n\
         {first_pass}\n\n\
         Below are web search results about the same song. Merge them into the list above without duplicates. \
         When a title appears in both, keep the more detailed entry. \
         Keep only real soundtrack placements and use exactly this format, with a blank line between the two sections:\n\
         {OUTPUT_FORMAT}\n\n\
         Search results:\n{snippets}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_name_the_song_and_format() {
        let p = placements("Hurt", "Johnny Cash");
        assert!(p.contains("'Hurt' by Johnny Cash"));
        assert!(p.contains("Movies:\nTitle (Year)\n\nTV Shows:"));

        let m = merge("Hurt", "Johnny Cash", "Movies:\nLogan (2017)", &["snippet https://x".into()]);
        assert!(m.contains("Movies:\nLogan (2017)"));
        assert!(m.ends_with("snippet https://x"));
    }
}
