use std::fmt;

/// Which towns `seed` writes
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SeedSet {
    /// The four serviced towns with no child data
    Basic,
    /// Serviced towns with budgets, a meeting and a thread, plus coming-soon towns
    Demo,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub schema_version: i32,
    pub municipalities: i64,
    pub budgets: i64,
    pub budget_categories: i64,
    pub meetings: i64,
    pub agenda_items: i64,
    pub forum_threads: i64,
    pub comments: i64,
    pub thread_tags: i64,
}

impl TableCounts {
    pub fn is_empty(&self) -> bool {
        self.municipalities == 0
    }
}

impl fmt::Display for TableCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "schema version:    {}", self.schema_version)?;
        writeln!(f, "municipalities:    {}", self.municipalities)?;
        writeln!(f, "budgets:           {}", self.budgets)?;
        writeln!(f, "budget categories: {}", self.budget_categories)?;
        writeln!(f, "meetings:          {}", self.meetings)?;
        writeln!(f, "agenda items:      {}", self.agenda_items)?;
        writeln!(f, "forum threads:     {}", self.forum_threads)?;
        writeln!(f, "comments:          {}", self.comments)?;
        write!(f, "thread tags:       {}", self.thread_tags)
    }
}
