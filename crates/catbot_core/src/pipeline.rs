use std::collections::BTreeMap;

use crate::api::{CategoryMember, WikiWriteApi};
use crate::classify::classify;
use crate::confirm::{ConfirmEdits, ConfirmResponse};
use crate::error::{BotError, Result};
use crate::membership::{contains_category, has_explicit_category};
use crate::model::{
    ArticleRef, CategoryRef, EditDecision, InterwikiLink, Language, MemberDecision, NS_CATEGORY,
    ProposedEdit, render_title,
};

pub const EDIT_SUMMARY: &str = "بوت: أضاف 1 تصنيف";

const LISTING_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Upper bound on categories taken from the unused-categories listing.
    pub unused_limit: usize,
    /// When non-empty, these Arabic categories replace the listing.
    pub categories: Vec<String>,
    pub edit_summary: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            unused_limit: crate::config::DEFAULT_UNUSED_LIMIT,
            categories: Vec::new(),
            edit_summary: EDIT_SUMMARY.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum CategoryOutcome {
    Skipped(EditDecision),
    Completed { members: usize, applied: usize },
    Failed(BotError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub categories_seen: usize,
    pub categories_completed: usize,
    pub categories_failed: usize,
    pub categories_skipped: BTreeMap<EditDecision, usize>,
    pub members_seen: usize,
    pub member_failures: usize,
    pub member_decisions: BTreeMap<EditDecision, usize>,
    pub edits_submitted: usize,
    pub edits_declined: usize,
    pub edits_failed: usize,
}

impl RunReport {
    pub fn member_count(&self, decision: EditDecision) -> usize {
        self.member_decisions.get(&decision).copied().unwrap_or(0)
    }

    pub fn skipped_categories(&self, decision: EditDecision) -> usize {
        self.categories_skipped.get(&decision).copied().unwrap_or(0)
    }

    pub fn log_summary(&self) {
        tracing::info!(
            seen = self.categories_seen,
            completed = self.categories_completed,
            failed = self.categories_failed,
            "categories"
        );
        for (reason, count) in &self.categories_skipped {
            tracing::info!(%reason, count, "categories skipped");
        }
        tracing::info!(
            seen = self.members_seen,
            failed = self.member_failures,
            "members"
        );
        for (decision, count) in &self.member_decisions {
            tracing::info!(%decision, count, "member decisions");
        }
        tracing::info!(
            submitted = self.edits_submitted,
            declined = self.edits_declined,
            failed = self.edits_failed,
            "edits"
        );
    }
}

/// Walks unused Arabic categories and proposes edits for their English
/// counterpart's explicit members.
pub struct Pipeline<A, C> {
    api: A,
    confirm: C,
    options: PipelineOptions,
    approve_all: bool,
    report: RunReport,
}

impl<A: WikiWriteApi, C: ConfirmEdits> Pipeline<A, C> {
    pub fn new(api: A, confirm: C, options: PipelineOptions) -> Self {
        Self {
            api,
            confirm,
            options,
            approve_all: false,
            report: RunReport::default(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn confirmer(&self) -> &C {
        &self.confirm
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Processes every selected category. Only a failure of the listing
    /// itself is returned; everything else is logged and counted.
    pub fn run(&mut self) -> Result<()> {
        if !self.options.categories.is_empty() {
            let titles = self.options.categories.clone();
            for title in titles {
                self.run_named_category(&title);
            }
            return Ok(());
        }

        let mut remaining = self.options.unused_limit;
        let mut continuation: Option<String> = None;
        tracing::info!(limit = remaining, "fetching unused categories");
        while remaining > 0 {
            let page = self
                .api
                .list_unused_categories(
                    Language::Ar,
                    remaining.min(LISTING_PAGE_SIZE),
                    continuation.as_deref(),
                )
                .inspect_err(|error| {
                    tracing::error!(%error, "failed to list unused categories");
                })?;
            if page.items.is_empty() {
                break;
            }
            for unused in page.items.into_iter().take(remaining) {
                remaining -= 1;
                let category = CategoryRef::from_title(Language::Ar, &unused.title);
                self.process_category(&category, unused.hidden);
            }
            continuation = page.continuation;
            if continuation.is_none() {
                break;
            }
        }
        if self.report.categories_seen == 0 {
            tracing::info!("no unused categories found");
        }
        Ok(())
    }

    fn run_named_category(&mut self, title: &str) {
        let category = CategoryRef::from_title(Language::Ar, title);
        if category.name.is_empty() {
            tracing::warn!(%title, "ignoring empty category name");
            return;
        }
        match self.api.category_is_hidden(Language::Ar, &category.title()) {
            Ok(hidden) => {
                self.process_category(&category, hidden);
            }
            Err(error) => self.record_category(&category, &CategoryOutcome::Failed(error)),
        }
    }

    /// Runs one Arabic category through the whole pipeline and records the
    /// outcome in the run report.
    pub fn process_category(&mut self, category: &CategoryRef, hidden: bool) -> CategoryOutcome {
        tracing::info!(category = %category.title(), "processing category");
        let outcome = match self.try_category(category, hidden) {
            Ok(outcome) => outcome,
            Err(BotError::InterwikiNotFound { .. }) => {
                CategoryOutcome::Skipped(EditDecision::SkipNoInterwiki)
            }
            Err(error) => CategoryOutcome::Failed(error),
        };
        self.record_category(category, &outcome);
        outcome
    }

    fn try_category(&mut self, ar_category: &CategoryRef, hidden: bool) -> Result<CategoryOutcome> {
        if let Some(reason) = classify(Language::Ar, &ar_category.name, hidden).skip_reason() {
            return Ok(CategoryOutcome::Skipped(reason));
        }

        let en_title =
            self.require_interwiki(Language::Ar, NS_CATEGORY, &ar_category.name, Language::En)?;
        let en_category = CategoryRef::from_title(Language::En, &en_title);
        tracing::info!(english = %en_category.title(), "english category");

        let en_hidden = self
            .api
            .category_is_hidden(Language::En, &en_category.title())?;
        if let Some(reason) = classify(Language::En, &en_category.name, en_hidden).skip_reason() {
            return Ok(CategoryOutcome::Skipped(reason));
        }

        self.process_members(ar_category, &en_category)
    }

    fn process_members(
        &mut self,
        ar_category: &CategoryRef,
        en_category: &CategoryRef,
    ) -> Result<CategoryOutcome> {
        let en_title = en_category.title();
        let mut continuation: Option<String> = None;
        let mut members = 0;
        let mut applied = 0;
        loop {
            let page =
                self.api
                    .list_category_members(Language::En, &en_title, continuation.as_deref())?;
            for member in &page.items {
                members += 1;
                if self.handle_member(ar_category, en_category, member) {
                    applied += 1;
                }
            }
            continuation = page.continuation;
            if continuation.is_none() {
                break;
            }
        }
        if members == 0 {
            tracing::info!(english = %en_title, "no members in english category");
        }
        Ok(CategoryOutcome::Completed { members, applied })
    }

    /// Decides what to do with one English member. Never submits anything.
    pub fn decide_member(
        &mut self,
        ar_category: &CategoryRef,
        en_category: &CategoryRef,
        member: &CategoryMember,
    ) -> Result<MemberDecision> {
        match self.try_member(ar_category, en_category, member) {
            Err(BotError::InterwikiNotFound { .. }) => {
                Ok(MemberDecision::skip(EditDecision::SkipNoInterwiki))
            }
            Err(BotError::PageNotFound(title)) => {
                tracing::info!(%title, "page not found");
                Ok(MemberDecision::skip(EditDecision::SkipNotFound))
            }
            other => other,
        }
    }

    fn try_member(
        &mut self,
        ar_category: &CategoryRef,
        en_category: &CategoryRef,
        member: &CategoryMember,
    ) -> Result<MemberDecision> {
        let en_text = self.api.get_page_text(Language::En, &member.title)?;
        if !has_explicit_category(&en_text.content, en_category, &member.title) {
            return Ok(MemberDecision::skip(EditDecision::SkipNotExplicit));
        }

        let article = ArticleRef::from_title(Language::En, member.namespace, &member.title);
        let ar_title =
            self.require_interwiki(Language::En, article.namespace, &article.name, Language::Ar)?;

        let ar_text = self.api.get_page_text(Language::Ar, &ar_title)?;
        let decision = if ar_text.is_redirect {
            EditDecision::SkipRedirect
        } else if contains_category(&ar_text.content, Language::Ar, &ar_category.name) {
            EditDecision::SkipAlreadyPresent
        } else {
            EditDecision::Apply
        };

        let edit = (decision == EditDecision::Apply).then(|| ProposedEdit {
            after: ar_text.with_category(&ar_category.name),
            before: ar_text,
        });
        Ok(MemberDecision {
            decision,
            target_title: Some(ar_title),
            edit,
        })
    }

    /// Returns true when an edit was submitted.
    fn handle_member(
        &mut self,
        ar_category: &CategoryRef,
        en_category: &CategoryRef,
        member: &CategoryMember,
    ) -> bool {
        self.report.members_seen += 1;
        let decided = match self.decide_member(ar_category, en_category, member) {
            Ok(decided) => decided,
            Err(error) => {
                self.report.member_failures += 1;
                tracing::warn!(member = %member.title, %error, "member failed");
                return false;
            }
        };

        *self
            .report
            .member_decisions
            .entry(decided.decision)
            .or_default() += 1;
        tracing::info!(
            member = %member.title,
            page = decided.target_title.as_deref().unwrap_or("-"),
            decision = %decided.decision,
            "member decided"
        );

        match decided.edit {
            Some(edit) => self.submit(edit),
            None => false,
        }
    }

    fn submit(&mut self, edit: ProposedEdit) -> bool {
        if !self.approve_all {
            match self.confirm.confirm(&edit) {
                Ok(ConfirmResponse::ApproveOne) => {}
                Ok(ConfirmResponse::ApproveAll) => self.approve_all = true,
                Ok(ConfirmResponse::SkipOne) => {
                    self.report.edits_declined += 1;
                    tracing::info!(page = %edit.after.title, "edit declined");
                    return false;
                }
                Err(error) => {
                    self.report.edits_declined += 1;
                    tracing::warn!(page = %edit.after.title, %error, "confirmation failed");
                    return false;
                }
            }
        }

        match self.api.save_page(
            Language::Ar,
            &edit.after.title,
            &edit.after.content,
            &self.options.edit_summary,
        ) {
            Ok(()) => {
                self.report.edits_submitted += 1;
                tracing::info!(page = %edit.after.title, "category added");
                true
            }
            Err(error) => {
                self.report.edits_failed += 1;
                tracing::warn!(page = %edit.after.title, %error, "edit rejected");
                false
            }
        }
    }

    fn require_interwiki(
        &mut self,
        language: Language,
        namespace: i32,
        name: &str,
        target: Language,
    ) -> Result<String> {
        let link = InterwikiLink {
            source_language: language,
            source_title: render_title(language, namespace, name),
            target_language: target,
            target: self.api.resolve_interwiki(language, namespace, name, target)?,
        };
        link.into_target()
    }

    fn record_category(&mut self, category: &CategoryRef, outcome: &CategoryOutcome) {
        self.report.categories_seen += 1;
        match outcome {
            CategoryOutcome::Skipped(reason) => {
                *self.report.categories_skipped.entry(*reason).or_default() += 1;
                tracing::info!(category = %category.title(), %reason, "category skipped");
            }
            CategoryOutcome::Completed { members, applied } => {
                self.report.categories_completed += 1;
                tracing::info!(
                    category = %category.title(),
                    members,
                    applied,
                    "category completed"
                );
            }
            CategoryOutcome::Failed(error) => {
                self.report.categories_failed += 1;
                tracing::warn!(category = %category.title(), %error, "category failed");
            }
        }
    }
}
