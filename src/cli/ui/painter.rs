use owo_colors::{OwoColorize, Style as OwoStyle};
use strum_macros::EnumIter;

/// Visual role of a piece of terminal text.
#[derive(Debug, Clone, Copy, Eq, PartialEq, EnumIter)]
pub(crate) enum Tone {
    Heading,
    Good,
    Bad,
    Muted,
    Emphasis,
    Payload,
}

impl Tone {
    fn style(self) -> OwoStyle {
        match self {
            Self::Heading => OwoStyle::new().bold().cyan(),
            Self::Good => OwoStyle::new().bold().green(),
            Self::Bad => OwoStyle::new().bold().yellow(),
            Self::Muted => OwoStyle::new().dimmed(),
            Self::Emphasis => OwoStyle::new().bold(),
            Self::Payload => OwoStyle::new().magenta(),
        }
    }
}

/// Colours terminal text when stdout is a terminal.
#[derive(Debug)]
pub(crate) struct Painter {
    use_colour: bool,
}

impl Painter {
    pub(crate) fn new(use_colour: bool) -> Self {
        Self { use_colour }
    }

    pub(crate) fn paint(&self, tone: Tone, text: impl AsRef<str>) -> String {
        let text = text.as_ref();
        if self.use_colour {
            text.style(tone.style()).to_string()
        } else {
            text.to_string()
        }
    }

    pub(crate) fn heading(&self, text: impl AsRef<str>) -> String {
        self.paint(Tone::Heading, text)
    }

    pub(crate) fn muted(&self, text: impl AsRef<str>) -> String {
        self.paint(Tone::Muted, text)
    }

    pub(crate) fn value(&self, text: impl AsRef<str>) -> String {
        self.paint(Tone::Emphasis, text)
    }

    /// Highlights a yes/no answer in green or yellow.
    pub(crate) fn flag(&self, enabled: bool) -> String {
        if enabled {
            self.paint(Tone::Good, "yes")
        } else {
            self.paint(Tone::Bad, "no")
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn plain_painter_leaves_text_untouched() {
        let painter = Painter::new(false);
        for tone in Tone::iter() {
            assert_eq!("bleio", painter.paint(tone, "bleio"));
        }
    }

    #[test]
    fn colour_painter_wraps_text_in_escapes() {
        let painter = Painter::new(true);
        for tone in Tone::iter() {
            let styled = painter.paint(tone, "bleio");
            assert_ne!("bleio", styled);
            assert!(styled.contains("bleio"));
        }
    }

    #[rstest]
    #[case(true, "yes")]
    #[case(false, "no")]
    fn flags_render_as_words(#[case] enabled: bool, #[case] expected: &str) {
        assert_eq!(expected, Painter::new(false).flag(enabled));
    }
}
