//! Splitting a fetched message into its text body and stored attachments.

use std::collections::HashSet;
use std::path::PathBuf;

use log::debug;
use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};

use crate::storage::AttachmentStore;

use super::error::{ExtractError, MailError, Result};

/// An attachment written to the attachments directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Stored file name, `mail{uid}_{original}`.
    pub filename: String,
    pub stored_path: PathBuf,
    /// MIME type guessed from the file extension.
    pub mime_type: Option<String>,
}

/// The parts of a message the dispatcher and the operator log care about.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    pub uid: u32,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

/// A MIME part that could not be turned into body text or a stored attachment.
#[derive(Debug)]
pub struct PartFailure {
    /// Position of the part in depth-first walk order.
    pub part_index: usize,
    pub error: ExtractError,
}

/// Result of extracting one message: what succeeded plus the per-part failures.
#[derive(Debug)]
pub struct Extraction {
    pub message: ParsedMessage,
    pub failures: Vec<PartFailure>,
}

/// Extracts body text and attachments from raw messages.
pub struct MessageExtractor {
    store: AttachmentStore,
}

impl MessageExtractor {
    pub fn new(store: AttachmentStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &AttachmentStore {
        &self.store
    }

    /// Parses `raw_email` and stores every attachment part under the UID-prefixed name.
    ///
    /// Only an unparseable message is an error. A part that fails to decode or
    /// store is reported in [`Extraction::failures`] and the walk continues.
    pub fn extract(&self, raw_email: &[u8], uid: u32) -> Result<Extraction> {
        let message = MessageParser::default()
            .parse(raw_email)
            .ok_or_else(|| MailError::ParseError("Failed to parse email message".to_string()))?;

        let mut parsed = ParsedMessage {
            uid,
            sender: message
                .from()
                .and_then(|addr| addr.first().map(format_address))
                .unwrap_or_default(),
            subject: message.subject().unwrap_or_default().to_string(),
            body: String::new(),
            attachments: Vec::new(),
        };
        let mut failures = Vec::new();

        debug!("Parsing email UID={} subject={:?}", uid, parsed.subject);

        let Some(root) = message.parts.first() else {
            return Ok(Extraction {
                message: parsed,
                failures,
            });
        };

        if !matches!(root.body, PartType::Multipart(_)) {
            // A single-part message is all body, whatever its headers say.
            match decode_text(root) {
                Ok(text) => parsed.body = text,
                Err(error) => failures.push(PartFailure {
                    part_index: 0,
                    error,
                }),
            }
            return Ok(Extraction {
                message: parsed,
                failures,
            });
        }

        let mut parts = Vec::new();
        walk_parts(&message, &mut parts);

        let mut taken_names = HashSet::new();
        for (part_index, part) in parts.into_iter().enumerate() {
            let disposition_attachment = has_attachment_disposition(part);

            // Every qualifying text part overwrites the previous one, so the last
            // plain-text part in walk order becomes the body.
            if is_plain_text(part) && !disposition_attachment {
                match decode_text(part) {
                    Ok(text) => parsed.body = text,
                    Err(error) => failures.push(PartFailure { part_index, error }),
                }
            }

            // Checked independently of the body rule: a named text part is both.
            let filename = part.attachment_name().filter(|n| !n.trim().is_empty());
            if disposition_attachment || filename.is_some() {
                match self.store_part(part, filename, uid, &mut taken_names) {
                    Ok(attachment) => parsed.attachments.push(attachment),
                    Err(error) => failures.push(PartFailure { part_index, error }),
                }
            }
        }

        debug!(
            "Extracted {} attachments from email UID={} ({} part failures)",
            parsed.attachments.len(),
            uid,
            failures.len()
        );

        Ok(Extraction {
            message: parsed,
            failures,
        })
    }

    fn store_part(
        &self,
        part: &MessagePart,
        filename: Option<&str>,
        uid: u32,
        taken_names: &mut HashSet<String>,
    ) -> std::result::Result<Attachment, ExtractError> {
        if part.is_encoding_problem {
            return Err(ExtractError::Decode(format!(
                "attachment '{}' has an undecodable transfer encoding",
                filename.unwrap_or("(unnamed)")
            )));
        }

        let original = match filename {
            Some(name) => sanitize_filename(name),
            None => format!("attachment.{}", mime_to_extension(&declared_mime_type(part))),
        };
        let stored_name = AttachmentStore::claim_name(
            &AttachmentStore::stored_name(uid, &original),
            taken_names,
        );

        let saved = self
            .store
            .save(&stored_name, part.contents())
            .map_err(|source| ExtractError::Storage {
                filename: stored_name.clone(),
                source,
            })?;

        let mime_type = mime_guess::from_path(&saved.path)
            .first_raw()
            .map(str::to_string);

        debug!(
            "Found attachment: {} ({}, {} bytes, {:?})",
            stored_name,
            mime_type.as_deref().unwrap_or("unknown"),
            part.contents().len(),
            saved.outcome
        );

        Ok(Attachment {
            filename: stored_name,
            stored_path: saved.path,
            mime_type,
        })
    }
}

/// Collects every part in depth-first structural order, descending into
/// forwarded messages unless the forwarded message is itself an attachment.
fn walk_parts<'a, 'x>(message: &'a Message<'x>, out: &mut Vec<&'a MessagePart<'x>>) {
    for part in &message.parts {
        out.push(part);
        if let PartType::Message(nested) = &part.body {
            if !has_attachment_disposition(part) && part.attachment_name().is_none() {
                walk_parts(nested, out);
            }
        }
    }
}

fn has_attachment_disposition(part: &MessagePart) -> bool {
    part.content_disposition()
        .is_some_and(|disposition| disposition.ctype().eq_ignore_ascii_case("attachment"))
}

/// A part without a Content-Type header defaults to text/plain.
fn is_plain_text(part: &MessagePart) -> bool {
    match part.content_type() {
        Some(ct) => {
            ct.ctype().eq_ignore_ascii_case("text")
                && ct.subtype().is_some_and(|s| s.eq_ignore_ascii_case("plain"))
        }
        None => !matches!(part.body, PartType::Multipart(_) | PartType::Message(_)),
    }
}

fn decode_text(part: &MessagePart) -> std::result::Result<String, ExtractError> {
    if part.is_encoding_problem {
        return Err(ExtractError::Decode(
            "text part has an undecodable transfer encoding".to_string(),
        ));
    }

    match &part.body {
        PartType::Text(text) | PartType::Html(text) => Ok(text.to_string()),
        PartType::Binary(data) | PartType::InlineBinary(data) => {
            String::from_utf8(data.to_vec()).map_err(|e| ExtractError::Decode(e.to_string()))
        }
        PartType::Message(nested) => String::from_utf8(nested.raw_message().to_vec())
            .map_err(|e| ExtractError::Decode(e.to_string())),
        PartType::Multipart(_) => Ok(String::new()),
    }
}

fn declared_mime_type(part: &MessagePart) -> String {
    part.content_type()
        .map(|ct| match ct.subtype() {
            Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
            None => ct.ctype().to_string(),
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Formats an email address for display.
/// If the address has a display name, formats as "Name <email@example.com>".
fn format_address(addr: &mail_parser::Addr) -> String {
    if let Some(name) = addr.name() {
        format!("{} <{}>", name, addr.address().unwrap_or_default())
    } else {
        addr.address().unwrap_or_default().to_string()
    }
}

/// Sanitizes a filename so it stays inside the attachments directory.
fn sanitize_filename(filename: &str) -> String {
    let filename = filename
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();

    let filename = filename.trim_matches(|c| c == '.' || c == ' ');

    if filename.is_empty() {
        "attachment".to_string()
    } else if filename.len() > 200 {
        // Keep the extension so the mime type can still be guessed.
        // A dot further than 50 bytes from the end is not an extension.
        let ext = match filename.rfind('.') {
            Some(start) if filename.len() - start <= 50 => &filename[start..],
            _ => "",
        };
        let mut cut = 200 - ext.len();
        while !filename.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}{}", &filename[..cut], ext)
    } else {
        filename.to_string()
    }
}

/// Extension for a generated name of an attachment that declared no filename.
fn mime_to_extension(mime_type: &str) -> &'static str {
    match mime_type.to_lowercase().as_str() {
        "application/pdf" => "pdf",
        "application/zip" => "zip",
        "application/json" => "json",
        "application/xml" | "text/xml" => "xml",
        "message/rfc822" => "eml",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/tiff" => "tiff",
        "image/bmp" => "bmp",
        "text/plain" => "txt",
        "text/html" => "html",
        "text/csv" => "csv",
        _ => "bin",
    }
}
