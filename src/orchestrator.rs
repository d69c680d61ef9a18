//! Reply planning: one dispatch table from inbound event to outbound actions.
//!
//! `Orchestrator::plan` never fails. Provider errors become fallback strings,
//! failed file lookups become an apology, and every path fills in the audit
//! fields so the caller can always write a record.

use tracing::{debug, warn};

use crate::event::{ChatIdentity, InboundEvent, MessageKind};
use crate::platform::{ChatPlatform, RemoteFile};
use crate::providers::{media, Capabilities};

/// Audit reply used when nothing was generated.
pub const NO_REPLY: &str = "No reply generated.";

const NO_VIDEO_FOUND: &str = "No downloadable video found.";

/// One call to make against the chat platform.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundAction {
    SendText { text: String },
    SendVoice { audio: Vec<u8> },
    Noop,
}

impl OutboundAction {
    /// `SendText`, or `Noop` for empty text since the platform rejects it.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            OutboundAction::Noop
        } else {
            OutboundAction::SendText { text }
        }
    }
}

/// What the audit record should say about this event.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditFields {
    pub message_type: MessageKind,
    pub message_content: String,
    pub reply_message: String,
    pub download_file: String,
}

impl AuditFields {
    fn new(message_type: MessageKind) -> Self {
        Self {
            message_type,
            message_content: String::new(),
            reply_message: NO_REPLY.to_string(),
            download_file: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub actions: Vec<OutboundAction>,
    pub audit: AuditFields,
}

impl Plan {
    /// File could not be resolved: apologize, record empty content.
    fn apology(kind: MessageKind, apology: &str) -> Self {
        let mut audit = AuditFields::new(kind);
        audit.reply_message = apology.to_string();
        Self {
            actions: vec![OutboundAction::text(apology)],
            audit,
        }
    }

    fn reply(kind: MessageKind, content: String, reply: String) -> Self {
        let mut audit = AuditFields::new(kind);
        audit.message_content = content;
        audit.reply_message = reply.clone();
        Self {
            actions: vec![OutboundAction::text(reply)],
            audit,
        }
    }

    fn with_download(mut self, url: impl Into<String>) -> Self {
        self.audit.download_file = url.into();
        self
    }
}

/// How a file-carrying kind is answered.
struct FileReply {
    kind: MessageKind,
    apology: &'static str,
}

impl FileReply {
    fn for_kind(kind: MessageKind) -> Self {
        let apology = match kind {
            MessageKind::Photo => "Sorry, could not retrieve the photo.",
            MessageKind::Video => "Sorry, could not retrieve the video.",
            MessageKind::VideoNote => "Sorry, could not retrieve the video note.",
            MessageKind::Document => "Sorry, could not retrieve the document.",
            _ => "Sorry, could not retrieve the audio file.",
        };
        Self { kind, apology }
    }

    fn template(&self, path: &str) -> String {
        match self.kind {
            MessageKind::Photo => format!("Received photo.\nPhoto Name: {path}"),
            MessageKind::Video => format!("Received video.\nVideo Name: {path}"),
            MessageKind::VideoNote => format!("Received video note.\nVideo Note: {path}"),
            MessageKind::Document => format!("Received document: {path}"),
            _ => format!("Received audio: {path}"),
        }
    }
}

/// Stateless planner over an injected provider set.
pub struct Orchestrator {
    caps: Capabilities,
    fallback_link: String,
}

impl Orchestrator {
    pub fn new(caps: Capabilities, fallback_link: impl Into<String>) -> Self {
        Self {
            caps,
            fallback_link: fallback_link.into(),
        }
    }

    pub async fn plan(
        &self,
        event: &InboundEvent,
        identity: &ChatIdentity,
        platform: &dyn ChatPlatform,
    ) -> Plan {
        let kind = event.kind();
        debug!("Planning reply for {} message", kind);

        match event {
            InboundEvent::Text { body } => self.plan_text(body, identity).await,
            InboundEvent::Voice { file_id } => self.plan_voice(file_id, platform).await,
            InboundEvent::Sticker { emoji } => {
                let prompt = emoji.as_deref().unwrap_or_default();
                let content = emoji.clone().unwrap_or_else(|| "Sticker received".to_string());
                self.ai_reply(kind, content, prompt).await
            }
            InboundEvent::Poll { question } => {
                if question.trim().is_empty() {
                    return self.link_reply(kind);
                }
                self.ai_reply(kind, question.clone(), question).await
            }
            InboundEvent::Venue { title, address } => {
                if title.is_empty() && address.is_empty() {
                    return self.link_reply(kind);
                }
                let prompt = format!("Venue: {title}\nAddress: {address}");
                self.ai_reply(kind, prompt.clone(), &prompt).await
            }
            InboundEvent::Animation { file_name, .. } => {
                let prompt = animation_prompt(file_name);
                self.ai_reply(kind, prompt.clone(), &prompt).await
            }
            InboundEvent::Location { lat, lon } => {
                let prompt = format!("latitude: {lat:?}, longitude: {lon:?}");
                self.ai_reply(kind, prompt.clone(), &prompt).await
            }
            InboundEvent::Photo { file_id } => self.plan_photo(file_id, platform).await,
            InboundEvent::Video { file_id }
            | InboundEvent::VideoNote { file_id }
            | InboundEvent::Audio { file_id } => {
                let reply = FileReply::for_kind(kind);
                match resolve(platform, file_id).await {
                    Some(file) => {
                        let text = reply.template(&file.path);
                        Plan::reply(kind, file.path, text).with_download(file.url)
                    }
                    None => Plan::apology(kind, reply.apology),
                }
            }
            InboundEvent::Document { file_id, file_name } => {
                let reply = FileReply::for_kind(kind);
                match resolve(platform, file_id).await {
                    Some(file) => {
                        Plan::reply(kind, file_name.clone(), reply.template(file_name))
                            .with_download(file.url)
                    }
                    None => Plan::apology(kind, reply.apology),
                }
            }
            InboundEvent::Unknown => Plan {
                actions: vec![OutboundAction::text(self.fallback_link.as_str())],
                audit: AuditFields::new(kind),
            },
        }
    }

    async fn plan_text(&self, body: &str, identity: &ChatIdentity) -> Plan {
        let kind = MessageKind::Text;

        if let (Some(link), Some(resolver)) = (media::status_link(body), &self.caps.media) {
            let resolved = match resolver.resolve(link).await {
                Ok(url) => url,
                Err(e) => {
                    warn!("Media resolution failed for {}: {}", link, e);
                    None
                }
            };
            let target = resolved.clone().unwrap_or_else(|| NO_VIDEO_FOUND.to_string());
            let reply = format!("Download video here:\n{target}");
            return Plan::reply(kind, body.to_string(), reply)
                .with_download(resolved.unwrap_or_default());
        }

        if body.starts_with("/start") {
            let first = identity.first_name.as_deref().unwrap_or("User");
            let last = identity.last_name.as_deref().unwrap_or_default();
            let greeting = format!("Hello {first} {last}\n\n");
            let reply = greeting + &self.caps.complete("Hi").await;
            let plan = Plan::reply(kind, body.to_string(), reply.clone());
            return self.with_voice(kind, plan, &reply).await;
        }

        self.ai_reply(kind, body.to_string(), body).await
    }

    async fn plan_voice(&self, file_id: &str, platform: &dyn ChatPlatform) -> Plan {
        let kind = MessageKind::Voice;
        let apology = FileReply::for_kind(kind).apology;

        let Some(file) = resolve(platform, file_id).await else {
            return Plan::apology(kind, apology);
        };
        let audio = match platform.download(&file).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Voice download failed: {:#}", e);
                return Plan::apology(kind, apology);
            }
        };

        let transcript = self.caps.transcribe("voice.ogg", audio).await;
        self.ai_reply(kind, transcript.clone(), &transcript)
            .await
            .with_download(file.url)
    }

    async fn plan_photo(&self, file_id: &str, platform: &dyn ChatPlatform) -> Plan {
        let kind = MessageKind::Photo;
        let reply = FileReply::for_kind(kind);

        let Some(file) = resolve(platform, file_id).await else {
            return Plan::apology(kind, reply.apology);
        };

        if let Some(ocr) = &self.caps.ocr {
            match platform.download(&file).await {
                Ok(image) => match ocr.recognize(image).await {
                    Ok(text) => {
                        let text = format!("📄 Extracted Text from Image:\n\n{text}");
                        return Plan::reply(kind, file.path, text).with_download(file.url);
                    }
                    Err(e) => warn!("OCR failed, using photo template: {}", e),
                },
                Err(e) => {
                    warn!("Photo download failed: {:#}", e);
                    return Plan::apology(kind, reply.apology);
                }
            }
        }

        let text = reply.template(&file.path);
        Plan::reply(kind, file.path, text).with_download(file.url)
    }

    /// `Complete` on `prompt`, plus a voice copy when speech is enabled.
    async fn ai_reply(&self, kind: MessageKind, content: String, prompt: &str) -> Plan {
        let reply = self.caps.complete(prompt).await;
        let plan = Plan::reply(kind, content, reply.clone());
        self.with_voice(kind, plan, &reply).await
    }

    async fn with_voice(&self, kind: MessageKind, mut plan: Plan, reply: &str) -> Plan {
        if let Some(audio) = self.caps.synthesize_reply(kind, reply).await {
            plan.actions.push(OutboundAction::SendVoice { audio });
        }
        plan
    }

    fn link_reply(&self, kind: MessageKind) -> Plan {
        Plan::reply(kind, String::new(), self.fallback_link.clone())
    }
}

/// Platform file lookup; both a refusal and a transport error count as failure.
async fn resolve(platform: &dyn ChatPlatform, file_id: &str) -> Option<RemoteFile> {
    match platform.get_file(file_id).await {
        Ok(Some(file)) => Some(file),
        Ok(None) => None,
        Err(e) => {
            warn!("File lookup for {} failed: {:#}", file_id, e);
            None
        }
    }
}

/// Prompt from an animation's file name: base name only, digits removed,
/// underscores become spaces, other punctuation is dropped.
pub fn animation_prompt(file_name: &str) -> String {
    let base = file_name.split('.').next().unwrap_or_default();

    let mut cleaned = String::with_capacity(base.len());
    let mut run = String::new();
    for c in base.chars().filter(|c| !c.is_numeric()) {
        if c.is_alphabetic() || c.is_whitespace() {
            flush_run(&mut run, &mut cleaned);
            cleaned.push(c);
        } else {
            run.push(c);
        }
    }
    flush_run(&mut run, &mut cleaned);

    let words: Vec<&str> = cleaned.split_whitespace().collect();
    format!("I am feeling {}", words.join(" "))
}

/// A separator run made only of underscores is a word break; a run with
/// punctuation in it is noise inside a word.
fn flush_run(run: &mut String, out: &mut String) {
    if !run.is_empty() && run.chars().all(|c| c == '_') {
        out.push(' ');
    }
    run.clear();
}
