// panel.rs
//
// 管理パネルの CRUD コントローラ。
// ローカルの一覧を楽観的に書き換えることはせず、書き込みが成功するたびに
// 一覧を stale にして取り直す (invalidate-and-refetch)。失敗はすべて
// 通知に変換され、ダイアログの状態は変えない。
use std::fmt;

use chrono::{Datelike, Utc};

use crate::models::{CreatePaperPayload, Paper, UpdatePaperPayload, blank_to_none};

/// ストア操作の失敗。message はそのまま通知に表示される
#[derive(Debug, Clone)]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StoreError {}

/// リモートストアとの境界。本番実装は client::ApiClient、
/// テストでは同じ契約を満たすインメモリ実装を使う。
#[allow(async_fn_in_trait)]
pub trait PaperStore {
    /// 未公開を含む全件 (管理用)
    async fn list_all(&self) -> Result<Vec<Paper>, StoreError>;
    async fn create(&self, fields: CreatePaperPayload) -> Result<Paper, StoreError>;
    async fn update(&self, id: i64, patch: UpdatePaperPayload) -> Result<Paper, StoreError>;
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}

// --- 通知 (トースト) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

// --- 編集ドラフト ---

/// ダイアログが開いている間だけ存在する編集用コピー。
/// 閉じれば破棄され、部分的に保存されることはない。
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub id: Option<i64>, // None なら新規作成
    pub title: String,
    pub authors: String,
    pub abstract_text: String,
    pub journal: String,
    pub year: i64,
    pub volume: String,
    pub issue: String,
    pub pages: String,
    pub doi: String,
    pub pdf_url: String,
    pub category: String,
    pub tags: String,
    pub citation_count: i64,
    pub featured: bool,
    pub published: bool,
}

impl Draft {
    /// 新規作成用の既定値 (空文字列・今年・被引用数ゼロ・両フラグ false)
    pub fn empty() -> Self {
        Self {
            id: None,
            title: String::new(),
            authors: String::new(),
            abstract_text: String::new(),
            journal: String::new(),
            year: Utc::now().year() as i64,
            volume: String::new(),
            issue: String::new(),
            pages: String::new(),
            doi: String::new(),
            pdf_url: String::new(),
            category: String::new(),
            tags: String::new(),
            citation_count: 0,
            featured: false,
            published: false,
        }
    }

    pub fn from_paper(paper: &Paper) -> Self {
        Self {
            id: Some(paper.id),
            title: paper.title.clone(),
            authors: paper.authors.clone(),
            abstract_text: paper.abstract_text.clone(),
            journal: paper.journal.clone().unwrap_or_default(),
            year: paper.year,
            volume: paper.volume.clone().unwrap_or_default(),
            issue: paper.issue.clone().unwrap_or_default(),
            pages: paper.pages.clone().unwrap_or_default(),
            doi: paper.doi.clone().unwrap_or_default(),
            pdf_url: paper.pdf_url.clone().unwrap_or_default(),
            category: paper.category.clone().unwrap_or_default(),
            tags: paper.tags.clone(),
            citation_count: paper.citation_count,
            featured: paper.featured,
            published: paper.published,
        }
    }

    fn create_payload(&self) -> CreatePaperPayload {
        CreatePaperPayload {
            title: self.title.trim().to_string(),
            authors: self.authors.trim().to_string(),
            abstract_text: self.abstract_text.clone(),
            journal: blank_to_none(Some(self.journal.clone())),
            year: Some(self.year),
            volume: blank_to_none(Some(self.volume.clone())),
            issue: blank_to_none(Some(self.issue.clone())),
            pages: blank_to_none(Some(self.pages.clone())),
            doi: blank_to_none(Some(self.doi.clone())),
            pdf_url: blank_to_none(Some(self.pdf_url.clone())),
            category: blank_to_none(Some(self.category.clone())),
            tags: self.tags.clone(),
            citation_count: self.citation_count,
            featured: self.featured,
            published: self.published,
        }
    }

    // フォーム全体の編集なので全フィールドを送る
    fn update_payload(&self) -> UpdatePaperPayload {
        UpdatePaperPayload {
            title: Some(self.title.trim().to_string()),
            authors: Some(self.authors.trim().to_string()),
            abstract_text: Some(self.abstract_text.clone()),
            journal: Some(self.journal.clone()),
            year: Some(self.year),
            volume: Some(self.volume.clone()),
            issue: Some(self.issue.clone()),
            pages: Some(self.pages.clone()),
            doi: Some(self.doi.clone()),
            pdf_url: Some(self.pdf_url.clone()),
            category: Some(self.category.clone()),
            tags: Some(self.tags.clone()),
            citation_count: Some(self.citation_count),
            featured: Some(self.featured),
            published: Some(self.published),
        }
    }
}

enum PendingWrite {
    Create(CreatePaperPayload),
    Update(i64, UpdatePaperPayload),
}

// --- コントローラ本体 ---

pub struct Panel {
    papers: Vec<Paper>,
    stale: bool,
    draft: Option<Draft>,
    pending_delete: Option<i64>,
    submitting: bool,
    notices: Vec<Notice>,
}

impl Panel {
    pub fn new() -> Self {
        Self {
            papers: Vec::new(),
            stale: true, // 初回は必ず取得する
            draft: None,
            pending_delete: None,
            submitting: false,
            notices: Vec::new(),
        }
    }

    /// 一覧を権威あるストアから取り直す
    pub async fn refresh<S: PaperStore>(&mut self, store: &S) {
        match store.list_all().await {
            Ok(papers) => {
                self.papers = papers;
                self.stale = false;
            }
            Err(e) => {
                self.notices.push(Notice::error(e.message));
            }
        }
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    // --- 編集ダイアログ ---

    pub fn open_create(&mut self) {
        self.draft = Some(Draft::empty());
    }

    pub fn open_edit(&mut self, paper: &Paper) {
        self.draft = Some(Draft::from_paper(paper));
    }

    /// ダイアログを閉じ、ドラフトを破棄する
    pub fn close_dialog(&mut self) {
        self.draft = None;
    }

    pub fn is_dialog_open(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft_mut(&mut self) -> Option<&mut Draft> {
        self.draft.as_mut()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// 送信前のローカル検証と直列化。
    /// 送信できない場合 (検証失敗・送信中・ダイアログ未表示) は None。
    fn begin_submit(&mut self) -> Option<PendingWrite> {
        if self.submitting {
            return None;
        }
        let draft = self.draft.as_ref()?;
        if draft.title.trim().is_empty() || draft.authors.trim().is_empty() {
            self.notices
                .push(Notice::error("Title and authors are required."));
            return None;
        }

        self.submitting = true;
        Some(match draft.id {
            None => PendingWrite::Create(draft.create_payload()),
            Some(id) => PendingWrite::Update(id, draft.update_payload()),
        })
    }

    /// 成功: 一覧を stale にし、ダイアログを閉じてドラフトを破棄。
    /// 失敗: エラー通知のみ。ダイアログは再試行のため開いたまま。
    fn finish_submit(&mut self, result: Result<(), StoreError>) {
        self.submitting = false;
        match result {
            Ok(()) => {
                self.stale = true;
                self.draft = None;
                self.notices.push(Notice::success("Saved."));
            }
            Err(e) => {
                self.notices.push(Notice::error(e.message));
            }
        }
    }

    /// ドラフトを作成または更新としてストアに送信する
    pub async fn submit<S: PaperStore>(&mut self, store: &S) {
        let Some(write) = self.begin_submit() else {
            return;
        };
        let result = match write {
            PendingWrite::Create(fields) => store.create(fields).await.map(|_| ()),
            PendingWrite::Update(id, patch) => store.update(id, patch).await.map(|_| ()),
        };
        self.finish_submit(result);
    }

    /// 公開フラグの切り替え。公開時刻の付与/消去はストア側の契約
    pub async fn toggle_published<S: PaperStore>(&mut self, store: &S, id: i64) {
        let Some(published) = self
            .papers
            .iter()
            .find(|paper| paper.id == id)
            .map(|paper| paper.published)
        else {
            self.notices.push(Notice::error("Paper not found."));
            return;
        };

        let patch = UpdatePaperPayload {
            published: Some(!published),
            ..Default::default()
        };
        match store.update(id, patch).await {
            Ok(_) => {
                self.stale = true;
                self.notices.push(Notice::success(if published {
                    "Unpublished."
                } else {
                    "Published."
                }));
            }
            Err(e) => {
                self.notices.push(Notice::error(e.message));
            }
        }
    }

    // --- 削除 (確認ステップ必須) ---

    /// 削除対象として印を付けるだけで、ストアは呼ばない
    pub fn request_delete(&mut self, id: i64) {
        self.pending_delete = Some(id);
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn pending_delete(&self) -> Option<i64> {
        self.pending_delete
    }

    /// 確認済みの削除を実行する。印が無ければ何もしない
    pub async fn confirm_delete<S: PaperStore>(&mut self, store: &S) {
        let Some(id) = self.pending_delete else {
            return;
        };
        match store.delete(id).await {
            Ok(()) => {
                self.stale = true;
                self.pending_delete = None;
                self.notices.push(Notice::success("Deleted."));
            }
            Err(e) => {
                // 確認ダイアログは開いたまま
                self.notices.push(Notice::error(e.message));
            }
        }
    }

    /// 表示待ちの通知を取り出す
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

impl Default for Panel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// PaperStore の契約 (公開時刻の付与を含む) を満たすインメモリ実装
    #[derive(Default)]
    struct MemoryStore {
        papers: Mutex<Vec<Paper>>,
        next_id: AtomicI64,
        calls: Mutex<Vec<&'static str>>,
        fail_with: Mutex<Option<String>>,
    }

    impl MemoryStore {
        fn fail_next(&self, message: &str) {
            *self.fail_with.lock().unwrap() = Some(message.to_string());
        }

        fn check_failure(&self) -> Result<(), StoreError> {
            match self.fail_with.lock().unwrap().take() {
                Some(message) => Err(StoreError::new(message)),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PaperStore for MemoryStore {
        async fn list_all(&self) -> Result<Vec<Paper>, StoreError> {
            self.calls.lock().unwrap().push("list_all");
            self.check_failure()?;
            Ok(self.papers.lock().unwrap().clone())
        }

        async fn create(&self, fields: CreatePaperPayload) -> Result<Paper, StoreError> {
            self.calls.lock().unwrap().push("create");
            self.check_failure()?;
            let now = Utc::now().to_rfc3339();
            let paper = Paper {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                title: fields.title,
                authors: fields.authors,
                abstract_text: fields.abstract_text,
                journal: fields.journal,
                year: fields.year.unwrap_or_else(|| Utc::now().year() as i64),
                volume: fields.volume,
                issue: fields.issue,
                pages: fields.pages,
                doi: fields.doi,
                pdf_url: fields.pdf_url,
                category: fields.category,
                tags: fields.tags,
                citation_count: fields.citation_count,
                featured: fields.featured,
                published: fields.published,
                published_at: fields.published.then(|| now.clone()),
                created_at: now,
            };
            self.papers.lock().unwrap().push(paper.clone());
            Ok(paper)
        }

        async fn update(&self, id: i64, patch: UpdatePaperPayload) -> Result<Paper, StoreError> {
            self.calls.lock().unwrap().push("update");
            self.check_failure()?;
            let mut papers = self.papers.lock().unwrap();
            let paper = papers
                .iter_mut()
                .find(|paper| paper.id == id)
                .ok_or_else(|| StoreError::new("Paper not found"))?;

            if let Some(title) = patch.title {
                paper.title = title;
            }
            if let Some(authors) = patch.authors {
                paper.authors = authors;
            }
            if let Some(published) = patch.published {
                if published && !paper.published {
                    paper.published_at = Some(Utc::now().to_rfc3339());
                } else if !published {
                    paper.published_at = None;
                }
                paper.published = published;
            }
            Ok(paper.clone())
        }

        async fn delete(&self, id: i64) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push("delete");
            self.check_failure()?;
            let mut papers = self.papers.lock().unwrap();
            let before = papers.len();
            papers.retain(|paper| paper.id != id);
            if papers.len() == before {
                return Err(StoreError::new("Paper not found"));
            }
            Ok(())
        }
    }

    async fn seed(store: &MemoryStore, title: &str, published: bool) -> Paper {
        store
            .create(CreatePaperPayload {
                title: title.to_string(),
                authors: "A. Author".to_string(),
                published,
                ..Default::default()
            })
            .await
            .expect("seeding failed")
    }

    fn error_messages(panel: &mut Panel) -> Vec<String> {
        panel
            .take_notices()
            .into_iter()
            .filter(|n| n.kind == NoticeKind::Error)
            .map(|n| n.message)
            .collect()
    }

    #[tokio::test]
    async fn create_with_empty_required_field_never_calls_the_store() {
        let store = MemoryStore::default();
        let mut panel = Panel::new();
        panel.refresh(&store).await;

        panel.open_create();
        panel.draft_mut().unwrap().authors = "A. Author".to_string();
        // title は空白のみ
        panel.draft_mut().unwrap().title = "   ".to_string();
        panel.submit(&store).await;

        assert!(!store.calls().contains(&"create"));
        assert!(panel.is_dialog_open());
        assert_eq!(
            error_messages(&mut panel),
            vec!["Title and authors are required.".to_string()]
        );
    }

    #[tokio::test]
    async fn successful_create_invalidates_and_next_read_sees_the_item() {
        let store = MemoryStore::default();
        let mut panel = Panel::new();
        panel.refresh(&store).await;
        assert!(!panel.is_stale());

        panel.open_create();
        {
            let draft = panel.draft_mut().unwrap();
            draft.title = "X".to_string();
            draft.authors = "Y".to_string();
        }
        panel.submit(&store).await;

        // 成功: ダイアログは閉じ、一覧は stale
        assert!(!panel.is_dialog_open());
        assert!(panel.is_stale());

        panel.refresh(&store).await;
        assert!(panel.papers().iter().any(|p| p.title == "X"));
        assert!(!panel.is_stale());
    }

    #[tokio::test]
    async fn failed_create_keeps_dialog_open_with_draft_intact() {
        let store = MemoryStore::default();
        let mut panel = Panel::new();
        panel.refresh(&store).await;

        panel.open_create();
        {
            let draft = panel.draft_mut().unwrap();
            draft.title = "Kept".to_string();
            draft.authors = "Kept Too".to_string();
        }
        store.fail_next("store exploded");
        panel.submit(&store).await;

        // 失敗: 再入力せず再試行できるようドラフトは残る
        assert!(panel.is_dialog_open());
        assert_eq!(panel.draft_mut().unwrap().title, "Kept");
        assert!(!panel.is_stale());
        assert_eq!(error_messages(&mut panel), vec!["store exploded".to_string()]);
    }

    #[tokio::test]
    async fn a_second_submit_while_one_is_pending_is_ignored() {
        let mut panel = Panel::new();
        panel.open_create();
        {
            let draft = panel.draft_mut().unwrap();
            draft.title = "X".to_string();
            draft.authors = "Y".to_string();
        }

        let first = panel.begin_submit();
        assert!(first.is_some());
        assert!(panel.is_submitting());

        // 送信中の二度目のクリックは無視される
        assert!(panel.begin_submit().is_none());

        panel.finish_submit(Ok(()));
        assert!(!panel.is_submitting());
    }

    #[tokio::test]
    async fn edit_submits_update_and_refetch_reflects_it() {
        let store = MemoryStore::default();
        let seeded = seed(&store, "Old title", false).await;
        let mut panel = Panel::new();
        panel.refresh(&store).await;

        let paper = panel.papers()[0].clone();
        panel.open_edit(&paper);
        panel.draft_mut().unwrap().title = "New title".to_string();
        panel.submit(&store).await;

        assert!(panel.is_stale());
        panel.refresh(&store).await;
        let updated = panel
            .papers()
            .iter()
            .find(|p| p.id == seeded.id)
            .expect("paper should still exist");
        assert_eq!(updated.title, "New title");
    }

    #[tokio::test]
    async fn toggling_published_stamps_and_clears_the_timestamp() {
        let store = MemoryStore::default();
        let seeded = seed(&store, "Draft paper", false).await;
        let mut panel = Panel::new();
        panel.refresh(&store).await;
        assert!(panel.papers()[0].published_at.is_none());

        panel.toggle_published(&store, seeded.id).await;
        panel.refresh(&store).await;
        assert!(panel.papers()[0].published);
        assert!(panel.papers()[0].published_at.is_some());

        panel.toggle_published(&store, seeded.id).await;
        panel.refresh(&store).await;
        assert!(!panel.papers()[0].published);
        assert!(panel.papers()[0].published_at.is_none());
    }

    #[tokio::test]
    async fn delete_intent_alone_never_calls_the_store() {
        let store = MemoryStore::default();
        let seeded = seed(&store, "Doomed", false).await;
        let mut panel = Panel::new();
        panel.refresh(&store).await;

        panel.request_delete(seeded.id);
        assert_eq!(panel.pending_delete(), Some(seeded.id));
        assert!(!store.calls().contains(&"delete"));

        // キャンセルしてもストアは呼ばれない
        panel.cancel_delete();
        panel.confirm_delete(&store).await;
        assert!(!store.calls().contains(&"delete"));
    }

    #[tokio::test]
    async fn confirmed_delete_removes_and_clears_the_mark() {
        let store = MemoryStore::default();
        let seeded = seed(&store, "Doomed", false).await;
        let mut panel = Panel::new();
        panel.refresh(&store).await;

        panel.request_delete(seeded.id);
        panel.confirm_delete(&store).await;

        assert!(store.calls().contains(&"delete"));
        assert_eq!(panel.pending_delete(), None);
        assert!(panel.is_stale());
        panel.refresh(&store).await;
        assert!(panel.papers().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_confirmation_open() {
        let store = MemoryStore::default();
        let seeded = seed(&store, "Sticky", false).await;
        let mut panel = Panel::new();
        panel.refresh(&store).await;

        panel.request_delete(seeded.id);
        store.fail_next("delete failed");
        panel.confirm_delete(&store).await;

        assert_eq!(panel.pending_delete(), Some(seeded.id));
        assert_eq!(error_messages(&mut panel), vec!["delete failed".to_string()]);
    }
}
