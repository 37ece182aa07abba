//! Numbered text menu.

use crate::diary_entry::DiaryEntry;
use crate::operations::Diary;
use crate::remote_store::RemoteStore;
use color_eyre::Result;
use std::io::{BufRead, Write};

pub struct Menu<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Menu { input, output }
    }

    /// Runs until the user exits or input ends. Operation failures are
    /// reported and the menu is shown again.
    pub async fn run<S: RemoteStore>(&mut self, diary: &Diary<S>) -> Result<()> {
        loop {
            writeln!(self.output, "\nDiary Application")?;
            writeln!(self.output, "1. Create new entry")?;
            writeln!(self.output, "2. Read an entry")?;
            writeln!(self.output, "3. Edit an entry")?;
            writeln!(self.output, "4. Search entries")?;
            writeln!(self.output, "5. Delete an entry")?;
            writeln!(self.output, "6. Exit")?;

            let Some(choice) = self.prompt("Enter your choice: ")? else {
                break;
            };
            let outcome = match choice.trim() {
                "1" => self.create(diary).await,
                "2" => self.read(diary).await,
                "3" => self.edit(diary).await,
                "4" => self.search(diary).await,
                "5" => self.delete(diary).await,
                "6" => break,
                _ => {
                    writeln!(self.output, "Invalid choice, please try again")?;
                    Ok(())
                }
            };
            if let Err(e) = outcome {
                writeln!(self.output, "Error: {e}")?;
            }
        }
        writeln!(self.output, "Goodbye")?;
        Ok(())
    }

    async fn create<S: RemoteStore>(&mut self, diary: &Diary<S>) -> Result<()> {
        let title = self.prompt("Enter diary entry title: ")?.unwrap_or_default();
        let body = self.prompt("Enter your entry: ")?.unwrap_or_default();

        let outcome = diary.create(&title, &body).await?;
        if let Some(warning) = outcome.duplicate {
            writeln!(self.output, "Warning: {warning}")?;
        }
        writeln!(self.output, "Entry saved to {}", outcome.location)?;
        Ok(())
    }

    async fn read<S: RemoteStore>(&mut self, diary: &Diary<S>) -> Result<()> {
        let Some(title) = self.choose_title(diary, "read")? else {
            return Ok(());
        };
        let entry = diary.read(&title).await?;
        self.print_entry(&entry)
    }

    async fn edit<S: RemoteStore>(&mut self, diary: &Diary<S>) -> Result<()> {
        let Some(title) = self.choose_title(diary, "edit")? else {
            return Ok(());
        };
        let current = diary.read(&title).await?;
        writeln!(self.output, "Current text: {}", current.body)?;

        let new_body = self
            .prompt("New text (leave blank to keep): ")?
            .unwrap_or_default();
        let new_title = self
            .prompt("New title (leave blank to keep): ")?
            .unwrap_or_default();

        let outcome = diary
            .edit(&title, Some(&new_body), Some(&new_title))
            .await?;
        if let Some(warning) = outcome.duplicate {
            writeln!(self.output, "Warning: {warning}")?;
        }
        writeln!(self.output, "Entry \"{}\" updated", outcome.entry.title)?;
        Ok(())
    }

    async fn search<S: RemoteStore>(&mut self, diary: &Diary<S>) -> Result<()> {
        let term = self.prompt("Search for: ")?.unwrap_or_default();
        let results = diary.search(&term).await?;
        if results.is_empty() {
            writeln!(self.output, "No matching entries")?;
        } else {
            writeln!(self.output, "Matching entries:")?;
            for title in results {
                writeln!(self.output, "- {title}")?;
            }
        }
        Ok(())
    }

    async fn delete<S: RemoteStore>(&mut self, diary: &Diary<S>) -> Result<()> {
        let Some(title) = self.choose_title(diary, "delete")? else {
            return Ok(());
        };
        let confirm = self
            .prompt(&format!("Delete \"{title}\"? [y/N]: "))?
            .unwrap_or_default();
        if !confirm.trim().eq_ignore_ascii_case("y") {
            writeln!(self.output, "Cancelled")?;
            return Ok(());
        }
        diary.delete(&title).await?;
        writeln!(self.output, "Entry \"{title}\" deleted")?;
        Ok(())
    }

    /// Lists titles by number. A blank answer or end of input cancels.
    fn choose_title<S: RemoteStore>(&mut self, diary: &Diary<S>, verb: &str) -> Result<Option<String>> {
        let titles = diary.list_titles()?;
        if titles.is_empty() {
            writeln!(self.output, "No entries found")?;
            return Ok(None);
        }

        writeln!(self.output, "\nSelect an entry to {verb}:")?;
        for (i, title) in titles.iter().enumerate() {
            writeln!(self.output, "{}. {}", i + 1, title)?;
        }

        loop {
            let Some(answer) = self.prompt("Enter the number of the entry: ")? else {
                return Ok(None);
            };
            let answer = answer.trim();
            if answer.is_empty() {
                return Ok(None);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=titles.len()).contains(&n) => return Ok(Some(titles[n - 1].clone())),
                Ok(_) => writeln!(self.output, "Invalid entry number.")?,
                Err(_) => writeln!(self.output, "Invalid input. Please enter a number.")?,
            }
        }
    }

    fn print_entry(&mut self, entry: &DiaryEntry) -> Result<()> {
        writeln!(self.output, "\n--- Diary Entry ---")?;
        writeln!(self.output, "Title: {}", entry.title)?;
        writeln!(self.output, "Date: {}", entry.timestamp)?;
        writeln!(self.output, "Description: {}", entry.body)?;
        Ok(())
    }

    /// `None` at end of input.
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
