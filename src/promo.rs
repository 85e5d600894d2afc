//! Static promotional embeds.

use scribe_core::message::Embed;

const BOOK_URL: &str = "https://a.co/d/7cKhbC7";
const LOGOS_URL: &str = "https://logoscompany.store";

const BLURPLE: u32 = 0x5865F2;
const GREEN: u32 = 0x2ECC71;

pub fn book_embed() -> Embed {
    Embed {
        title: "Recommended Read".to_string(),
        description: "Check out this book — a great pick for readers!".to_string(),
        url: Some(BOOK_URL.to_string()),
        color: BLURPLE,
        // Placeholder cover image.
        thumbnail: Some("https://m.media-amazon.com/images/I/51-example.jpg".to_string()),
        fields: vec![("Buy it here".to_string(), BOOK_URL.to_string())],
        footer: Some("Promoted".to_string()),
    }
}

pub fn logos_embed() -> Embed {
    Embed {
        title: "LogosCompany — Custom Logos & Branding".to_string(),
        description: "Professional logo design and branding at LogosCompany. \
                      Visit their shop for templates and custom design."
            .to_string(),
        url: Some(LOGOS_URL.to_string()),
        color: GREEN,
        thumbnail: None,
        fields: vec![("Shop".to_string(), LOGOS_URL.to_string())],
        footer: Some("Promoted".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_embed() {
        let embed = book_embed();
        assert_eq!(embed.url.as_deref(), Some(BOOK_URL));
        assert_eq!(embed.fields, vec![("Buy it here".into(), BOOK_URL.into())]);
        assert!(embed.thumbnail.is_some());
    }

    #[test]
    fn test_logos_embed() {
        let embed = logos_embed();
        assert_eq!(embed.color, 0x2ECC71);
        assert!(embed.description.starts_with("Professional logo design"));
        assert!(embed.description.contains("LogosCompany. Visit their shop"));
        assert_eq!(embed.footer.as_deref(), Some("Promoted"));
    }
}
