// lightbox.rs
//
// 一覧/詳細ビューのナビゲーションコントローラ。
// コレクション (リモート取得 or 組み込みのフォールバック) から1件を
// 全画面表示で開き、前後の項目へ循環的に移動する。
use std::sync::Arc;

use crate::models::{Essay, Photo};

/// ライトボックスに並べられる項目
pub trait Displayable {
    fn id(&self) -> i64;
}

impl Displayable for Photo {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Displayable for Essay {
    fn id(&self) -> i64 {
        self.id
    }
}

/// 詳細ビューが開いている間、ページスクロールを止める対象。
/// suspend/resume は対で呼ばれる (解放は ScrollHold の Drop が保証する)。
pub trait ScrollSurface {
    fn suspend(&self);
    fn resume(&self);
}

/// スクロールを持たない表示先 (テストやヘッドレス用)
pub struct NoScroll;

impl ScrollSurface for NoScroll {
    fn suspend(&self) {}
    fn resume(&self) {}
}

/// スコープ付きのスクロール停止。Drop で必ず resume する。
struct ScrollHold {
    surface: Arc<dyn ScrollSurface>,
}

impl ScrollHold {
    fn acquire(surface: Arc<dyn ScrollSurface>) -> Self {
        surface.suspend();
        Self { surface }
    }
}

impl Drop for ScrollHold {
    fn drop(&mut self) {
        self.surface.resume();
    }
}

/// 表示中のコレクションがどちら由来か。
/// フォールバックは丸ごと置き換えであり、リモートと混ざることはない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

pub struct Lightbox<T: Displayable + Clone> {
    items: Vec<T>,
    fallback: Vec<T>,
    source: Source,
    surface: Arc<dyn ScrollSurface>,
    selected: Option<i64>,
    hold: Option<ScrollHold>,
}

impl<T: Displayable + Clone> Lightbox<T> {
    /// ロード完了まではフォールバックコレクションを表示する
    pub fn new(fallback: Vec<T>, surface: Arc<dyn ScrollSurface>) -> Self {
        Self {
            items: fallback.clone(),
            fallback,
            source: Source::Fallback,
            surface,
            selected: None,
            hold: None,
        }
    }

    /// リモート取得の結果を反映する。
    /// 欠損または空ならフォールバックを丸ごと代入する (マージはしない)。
    pub fn set_remote(&mut self, remote: Option<Vec<T>>) {
        match remote {
            Some(items) if !items.is_empty() => {
                self.items = items;
                self.source = Source::Remote;
            }
            _ => {
                self.items = self.fallback.clone();
                self.source = Source::Fallback;
            }
        }
    }

    /// 項目を詳細ビューで開く。開いている間はページスクロールを止める。
    pub fn open(&mut self, id: i64) {
        self.selected = Some(id);
        if self.hold.is_none() {
            self.hold = Some(ScrollHold::acquire(Arc::clone(&self.surface)));
        }
    }

    /// 詳細ビューを閉じ、スクロールを再開する
    pub fn close(&mut self) {
        self.selected = None;
        self.hold = None; // Drop が resume を呼ぶ
    }

    /// 隣の項目へ移動する。選択が無ければ何もしない。
    ///
    /// インデックスは毎回現在のコレクションから引き直す (選択後に
    /// コレクションが入れ替わっている場合があるため)。末尾の次は先頭、
    /// 先頭の前は末尾に循環する。選択中の id がコレクションから消えて
    /// いた場合はどちら向きでも先頭に落とす。
    pub fn navigate(&mut self, direction: Direction) {
        let Some(current) = self.selected else {
            return;
        };
        if self.items.is_empty() {
            return;
        }

        let len = self.items.len() as i64;
        let index = match self.items.iter().position(|item| item.id() == current) {
            Some(index) => {
                let index = index as i64;
                match direction {
                    Direction::Next => (index + 1).rem_euclid(len),
                    Direction::Prev => (index - 1).rem_euclid(len),
                }
            }
            None => 0,
        };
        self.selected = Some(self.items[index as usize].id());
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn selected_id(&self) -> Option<i64> {
        self.selected
    }

    /// 選択中の項目 (コレクションから消えていれば None)
    pub fn selected(&self) -> Option<&T> {
        let id = self.selected?;
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn is_open(&self) -> bool {
        self.selected.is_some()
    }
}
