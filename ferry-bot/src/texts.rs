//! User-facing prompt, warning and summary texts.
//!
//! Messages are sent with HTML parse mode; anything interpolated from
//! user input is escaped here.

use crate::traits::TransferError;
use crate::types::TransferResult;

pub const WELCOME: &str = "Hi! I am your archiver bot.\n\
    To get started, send me the id of the channel you want to copy from \
    (e.g. <code>-1001234567890</code> or <code>@mychannel</code>).";

pub const HELP: &str = "<b>Archiver bot help</b>\n\n\
    This bot copies messages from a source channel into a destination channel of yours.\n\n\
    <b>Steps:</b>\n\
    1. Send the source channel id (e.g. <code>-1001234567890</code>). \
    The bot must be a member of the channel, or the channel must be public.\n\
    2. Forward every message you want archived to this bot.\n\
    3. Send /archive when you are done selecting.\n\
    4. Send the destination channel id; the bot copies the selection over and reports the result.";

pub const USAGE: &str = "<b>Usage example</b>\n\n\
    You: <code>-1001234567890</code>\n\
    Bot: source confirmed, forward your messages.\n\n\
    You: [forward message X from the source channel]\n\
    Bot: message 1 saved.\n\n\
    You: /archive\n\
    Bot: send the destination channel id.";

pub const NEED_SOURCE_HINT: &str = "Please send the source channel id first \
    (e.g. <code>-1001234567890</code>), or /help.";

pub const SOURCE_RETRY: &str = "Could not find that channel. Check the id \
    (e.g. <code>-1001234567890</code> or a public <code>@handle</code>) and try again.";

pub const SELECTING_HINT: &str = "Forward the messages you want archived, \
    or send /archive to archive the current selection.";

pub const SELECTION_UNUSABLE: &str = "⚠️ That forward carries no attribution, so the \
    original message cannot be located. It was not added to the selection.";

pub const NOTHING_SELECTED: &str = "Nothing to archive yet. Forward some messages \
    first, then send /archive.";

pub const ASK_DESTINATION: &str = "Send the <b>destination channel id</b> (where the \
    messages should be copied), e.g. <code>-100987654321</code>.";

pub const DESTINATION_RETRY: &str = "Could not find the destination channel. Check the \
    id and send it again, or cancel.";

pub const CANCELLED: &str = "Archive cancelled. The selection was cleared; forward \
    messages to start a new batch.";

pub fn source_confirmed(label: &str) -> String {
    format!(
        "✅ Source channel <b>{}</b> confirmed.\n\
         Now forward the messages you want archived to this bot.",
        html_escape::encode_text(label)
    )
}

pub fn selection_count(count: usize) -> String {
    format!("✅ Message {count} saved. Send /archive when you are done selecting.")
}

pub fn selection_count_unverified(count: usize) -> String {
    format!(
        "⚠️ Message {count} saved, but its origin could not be verified; \
         the copy may fail. Send /archive when you are done selecting."
    )
}

pub fn destination_shortcut(label: &str) -> String {
    format!("Use {} again", label)
}

pub fn run_started(count: usize) -> String {
    format!("⏳ Archiving {count} message(s) to the destination channel...")
}

pub fn run_summary(result: &TransferResult) -> String {
    format!(
        "<b>Archive finished!</b>\n\
         ✅ Succeeded: {}\n\
         ❌ Failed: {}\n\n\
         You can forward new messages to select another batch.",
        result.succeeded, result.failed
    )
}

pub fn systemic_failure(error: &TransferError) -> String {
    format!(
        "❌ A systemic error stopped the archive before any message was copied: {}\n\
         Your selection is intact; send the destination id again to retry.",
        html_escape::encode_text(&error.to_string())
    )
}
