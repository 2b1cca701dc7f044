//! Classification of single `Report.wer` lines.
//!
//! Every meaningful line has the shape `head=value`, where `head` takes one of four forms:
//!
//! ```text
//! AppName=Notepad                  plain
//! LoadedModule[3]=C:\x\y.dll       indexed
//! Sig[0].Name=Application Name     indexed, with a sub-key
//! Response.BucketId=deadbeef       dotted
//! ```

/// A classified `Report.wer` line, borrowing from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WerLine<'a> {
    /// `Field=value`
    Plain { field: &'a str, value: &'a str },
    /// `Field[n]=value`
    Indexed { field: &'a str, value: &'a str },
    /// `Field[n].Name=label` or `Field[n].Key=label`, declares the label for the next entry.
    IndexedLabel { field: &'a str, label: &'a str },
    /// `Field[n].Sub=value` for any other `Sub`, the value belongs to the last declared label.
    IndexedEntry { field: &'a str, value: &'a str },
    /// `Field.Sub=value`
    Dotted {
        field: &'a str,
        sub_key: &'a str,
        value: &'a str,
    },
}

impl<'a> WerLine<'a> {
    /// Classifies a single raw line.
    ///
    /// Surrounding whitespace is ignored. Returns `None` when the line has no `=` separator.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let (head, value) = raw.trim().split_once('=')?;

        let line = if head.contains('[') && head.contains(']') {
            let field = head.split_once('[').map_or(head, |(f, _)| f);
            if head.contains('.') {
                if head.ends_with(".Name") || head.ends_with(".Key") {
                    WerLine::IndexedLabel {
                        field,
                        label: value,
                    }
                } else {
                    WerLine::IndexedEntry { field, value }
                }
            } else {
                WerLine::Indexed { field, value }
            }
        } else if let Some((field, sub_key)) = head.split_once('.') {
            WerLine::Dotted {
                field,
                sub_key,
                value,
            }
        } else {
            WerLine::Plain { field: head, value }
        };

        Some(line)
    }

    /// The name of the record field this line contributes to.
    pub fn field(&self) -> &'a str {
        match *self {
            WerLine::Plain { field, .. }
            | WerLine::Indexed { field, .. }
            | WerLine::IndexedLabel { field, .. }
            | WerLine::IndexedEntry { field, .. }
            | WerLine::Dotted { field, .. } => field,
        }
    }
}
