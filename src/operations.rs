//! Create, read, edit, search and delete, composed from the local index and
//! the remote store.
//!
//! Each operation loads the index fresh, talks to the store, and saves the
//! index at most once at the end. A failed remote write always returns before
//! the index is saved.

use crate::diary_entry::DiaryEntry;
use crate::diary_index::{DiaryIndex, TitleIndex};
use crate::error::{DiaryError, Result};
use crate::remote_store::RemoteStore;
use log::{error, info, warn};
use std::fmt;

/// An existing index entry was replaced. The operation still succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateTitleWarning {
    pub title: String,
}

impl fmt::Display for DuplicateTitleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "An entry titled \"{}\" already existed and was replaced",
            self.title
        )
    }
}

#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub location: String,
    pub duplicate: Option<DuplicateTitleWarning>,
}

#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub entry: DiaryEntry,
    pub location: String,
    pub duplicate: Option<DuplicateTitleWarning>,
}

pub struct Diary<S: RemoteStore> {
    store: S,
    index: DiaryIndex,
}

impl<S: RemoteStore> Diary<S> {
    pub fn new(store: S, index: DiaryIndex) -> Self {
        Diary { store, index }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Titles in index order.
    pub fn list_titles(&self) -> Result<Vec<String>> {
        Ok(self.index.load()?.into_keys().collect())
    }

    pub async fn create(&self, title: &str, body: &str) -> Result<CreateOutcome> {
        if title.trim().is_empty() {
            return Err(DiaryError::InvalidInput("title must not be blank".to_string()));
        }
        if body.trim().is_empty() {
            return Err(DiaryError::InvalidInput("entry text must not be blank".to_string()));
        }

        let entry = DiaryEntry::new(title, body);
        let location = self
            .store
            .create_document(&entry.to_json())
            .await
            .inspect_err(|e| error!("event=entry_create status=failed title={title:?} error={e}"))?;

        let mut titles = self.index.load()?;
        let duplicate = titles
            .insert(title.to_string(), location.clone())
            .map(|_| duplicate_of(title));
        self.index.save(&titles)?;

        info!("event=entry_create status=ok title={title:?} location={location}");
        Ok(CreateOutcome {
            location,
            duplicate,
        })
    }

    pub async fn read(&self, title: &str) -> Result<DiaryEntry> {
        let titles = self.index.load()?;
        let location = resolve(&titles, title)?;
        self.store
            .fetch_document(location)
            .await
            .inspect_err(|e| error!("event=entry_read status=failed title={title:?} error={e}"))
    }

    /// Blank `new_body` keeps the body. Blank or unchanged `new_title` keeps the title.
    pub async fn edit(
        &self,
        title: &str,
        new_body: Option<&str>,
        new_title: Option<&str>,
    ) -> Result<EditOutcome> {
        let mut titles = self.index.load()?;
        let location = resolve(&titles, title)?.to_string();
        let mut entry = self.store.fetch_document(&location).await?;

        if let Some(body) = new_body.filter(|b| !b.trim().is_empty()) {
            entry.body = body.to_string();
        }
        let rename = new_title.filter(|t| !t.trim().is_empty() && *t != title);
        if let Some(new_title) = rename {
            entry.title = new_title.to_string();
        }
        entry.touch();

        let payload = entry.to_json();
        let saved = if self.store.supports_overwrite() {
            self.store
                .overwrite_document(&location, &payload)
                .await
                .map(|_| location)
        } else {
            self.store.create_document(&payload).await
        };
        let location = saved
            .inspect_err(|e| error!("event=entry_edit status=failed title={title:?} error={e}"))?;

        let duplicate = match rename {
            Some(new_title) => {
                titles.shift_remove(title);
                titles
                    .insert(new_title.to_string(), location.clone())
                    .map(|_| duplicate_of(new_title))
            }
            None => {
                titles.insert(title.to_string(), location.clone());
                None
            }
        };
        self.index.save(&titles)?;

        info!(
            "event=entry_edit status=ok title={title:?} new_title={:?} location={location}",
            entry.title
        );
        Ok(EditOutcome {
            entry,
            location,
            duplicate,
        })
    }

    /// Case-insensitive substring match on titles, then on bodies.
    ///
    /// A title match skips the fetch. An entry whose fetch fails counts as no match.
    pub async fn search(&self, term: &str) -> Result<Vec<String>> {
        let titles = self.index.load()?;
        let needle = term.to_lowercase();
        let mut matches = Vec::new();

        for (title, location) in &titles {
            if title.to_lowercase().contains(&needle) {
                matches.push(title.clone());
                continue;
            }
            match self.store.fetch_document(location).await {
                Ok(entry) if entry.body.to_lowercase().contains(&needle) => {
                    matches.push(title.clone())
                }
                Ok(_) => {}
                Err(e) => warn!("event=search_fetch status=skipped title={title:?} error={e}"),
            }
        }

        info!("event=entry_search status=ok matches={}", matches.len());
        Ok(matches)
    }

    /// Blanks the remote document, then drops the title from the index.
    pub async fn delete(&self, title: &str) -> Result<()> {
        let mut titles = self.index.load()?;
        let location = resolve(&titles, title)?.to_string();

        self.store
            .overwrite_document(&location, &serde_json::json!({}))
            .await
            .inspect_err(|e| error!("event=entry_delete status=failed title={title:?} error={e}"))?;

        titles.shift_remove(title);
        self.index.save(&titles)?;
        info!("event=entry_delete status=ok title={title:?}");
        Ok(())
    }
}

fn resolve<'a>(titles: &'a TitleIndex, title: &str) -> Result<&'a str> {
    titles
        .get(title)
        .map(String::as_str)
        .ok_or_else(|| DiaryError::EntryNotFound(title.to_string()))
}

fn duplicate_of(title: &str) -> DuplicateTitleWarning {
    warn!("event=duplicate_title title={title:?}");
    DuplicateTitleWarning {
        title: title.to_string(),
    }
}
