//! One-shot push and pull, for scripts and on-demand use.

use std::sync::Arc;
use tracing::info;

use crate::{
    client::ClipRemote,
    clip::{Clip, ClipContent, ClipSubmission, Source},
    clipboard::{read_clipboard, write_clipboard, ClipboardBackend},
    ClipSyncError, Result,
};

/// Sends whatever is on the local clipboard.
pub async fn push_clipboard<C, R>(
    clipboard: Arc<C>,
    remote: &R,
    source: Source,
) -> Result<ClipContent>
where
    C: ClipboardBackend + ?Sized + 'static,
    R: ClipRemote + ?Sized,
{
    let snapshot = read_clipboard(clipboard).await?.ok_or_else(|| {
        ClipSyncError::Clipboard("Clipboard is empty or unsupported".to_string())
    })?;

    let content = snapshot.into_content()?;
    remote
        .push(&ClipSubmission::new(content.clone(), source))
        .await?;

    info!("Sent {} clip to server", content.clip_type);
    Ok(content)
}

pub async fn push_text<R>(remote: &R, text: &str, source: Source) -> Result<()>
where
    R: ClipRemote + ?Sized,
{
    remote
        .push(&ClipSubmission::new(ClipContent::text(text), source))
        .await?;

    info!("Sent text clip to server");
    Ok(())
}

/// Copies the server's latest clip onto the local clipboard.
///
/// Returns `None` when the server has nothing stored yet.
pub async fn pull_clipboard<C, R>(clipboard: Arc<C>, remote: &R) -> Result<Option<Clip>>
where
    C: ClipboardBackend + ?Sized + 'static,
    R: ClipRemote + ?Sized,
{
    let clip = match remote.latest().await? {
        Some(c) => c,
        None => return Ok(None),
    };

    write_clipboard(clipboard, clip.content()).await?;
    info!("Copied latest {} from server to clipboard", clip.clip_type);
    Ok(Some(clip))
}
