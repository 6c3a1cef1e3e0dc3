use std::collections::HashMap;

use sqlx::{sqlite::SqliteExecutor, FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use super::{group_by_parent, push_id_list};
use crate::database::models::views::{
    AgendaItemList, AgendaItemView, MeetingList, MeetingSummary, MeetingView, MeetingWithAgenda,
    MunicipalityRef, Pagination,
};
use crate::database::models::{AgendaItemRecord, MeetingRecord, MeetingStatus};
use crate::types::PageRequest;
use crate::utils::now_timestamp;

const MEETING_WITH_TOWN_SELECT: &str =
    "SELECT mt.id, mt.title, mt.date, mt.time, mt.committee, mt.status, mt.municipality_id, \
     mt.created_at, mt.updated_at, m.name, m.slug \
     FROM meetings mt JOIN municipalities m ON m.id = mt.municipality_id";

const AGENDA_ITEM_WITH_MEETING_SELECT: &str =
    "SELECT a.id, a.content, a.item_order, a.meeting_id, \
     mt.title AS meeting_title, mt.date AS meeting_date, mt.committee AS meeting_committee, \
     m.name AS municipality_name, m.slug AS municipality_slug \
     FROM agenda_items a \
     JOIN meetings mt ON mt.id = a.meeting_id \
     JOIN municipalities m ON m.id = mt.municipality_id";

/// Optional filters of `GET /api/meetings`
#[derive(Debug, Clone, Default)]
pub struct MeetingFilter {
    pub municipality_id: Option<String>,
    pub committee: Option<String>,
    pub status: Option<MeetingStatus>,
}

impl MeetingFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        let mut glue = " WHERE ";
        if let Some(id) = &self.municipality_id {
            qb.push(glue).push("mt.municipality_id = ").push_bind(id.clone());
            glue = " AND ";
        }
        if let Some(committee) = &self.committee {
            qb.push(glue).push("mt.committee = ").push_bind(committee.clone());
            glue = " AND ";
        }
        if let Some(status) = self.status {
            qb.push(glue).push("mt.status = ").push_bind(status.as_str());
        }
    }
}

/// Fields of `PATCH /api/meetings/{id}`; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct MeetingChanges {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub committee: Option<String>,
    pub status: Option<MeetingStatus>,
}

#[derive(FromRow)]
struct MeetingRow {
    #[sqlx(flatten)]
    meeting: MeetingRecord,
    #[sqlx(flatten)]
    municipality: MunicipalityRef,
}

#[derive(FromRow)]
struct AgendaItemRow {
    #[sqlx(flatten)]
    item: AgendaItemRecord,
    meeting_title: String,
    meeting_date: String,
    meeting_committee: String,
    municipality_name: String,
    municipality_slug: String,
}

impl AgendaItemRow {
    fn into_view(self) -> AgendaItemView {
        AgendaItemView {
            meeting: MeetingSummary {
                id: self.item.meeting_id.clone(),
                title: self.meeting_title,
                date: self.meeting_date,
                committee: self.meeting_committee,
                municipality: MunicipalityRef {
                    name: self.municipality_name,
                    slug: self.municipality_slug,
                },
            },
            item: self.item,
        }
    }
}

/// Database operations for meetings
impl MeetingRecord {
    pub async fn insert<'e>(&self, executor: impl SqliteExecutor<'e>) -> sqlx::Result<()> {
        debug!("Inserting meeting '{}' on {}", self.title, self.date);

        sqlx::query(
            "INSERT INTO meetings
             (id, title, date, time, committee, status, municipality_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.title)
        .bind(&self.date)
        .bind(&self.time)
        .bind(&self.committee)
        .bind(&self.status)
        .bind(&self.municipality_id)
        .bind(&self.created_at)
        .bind(&self.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn exists<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> sqlx::Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM meetings WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(found.is_some())
    }

    pub async fn get_view(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<MeetingView>> {
        let row: Option<MeetingRow> =
            sqlx::query_as(&format!("{} WHERE mt.id = ?", MEETING_WITH_TOWN_SELECT))
                .bind(id)
                .fetch_optional(pool)
                .await?;

        match row {
            Some(row) => Ok(Self::attach_agenda(pool, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Filtered page, latest date first
    pub async fn list(
        pool: &SqlitePool,
        filter: &MeetingFilter,
        page: PageRequest,
    ) -> sqlx::Result<MeetingList> {
        let mut qb = QueryBuilder::<Sqlite>::new(MEETING_WITH_TOWN_SELECT);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY mt.date DESC, mt.rowid ASC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let rows: Vec<MeetingRow> = qb.build_query_as().fetch_all(pool).await?;

        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM meetings mt");
        filter.push_where(&mut count_qb);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        Ok(MeetingList {
            meetings: Self::attach_agenda(pool, rows).await?,
            pagination: Pagination::new(total, page.limit, page.offset),
        })
    }

    pub async fn list_for_municipality(
        pool: &SqlitePool,
        municipality_id: &str,
    ) -> sqlx::Result<Vec<MeetingWithAgenda>> {
        let meetings: Vec<MeetingRecord> = sqlx::query_as(
            "SELECT id, title, date, time, committee, status, municipality_id, created_at, updated_at
             FROM meetings WHERE municipality_id = ? ORDER BY date DESC, rowid ASC",
        )
        .bind(municipality_id)
        .fetch_all(pool)
        .await?;

        let ids: Vec<String> = meetings.iter().map(|m| m.id.clone()).collect();
        let mut items = AgendaItemRecord::list_for_meetings(pool, &ids).await?;

        Ok(meetings
            .into_iter()
            .map(|meeting| MeetingWithAgenda {
                agenda_items: items.remove(&meeting.id).unwrap_or_default(),
                meeting,
            })
            .collect())
    }

    /// Partial update; returns false when no meeting has this id
    pub async fn update(pool: &SqlitePool, id: &str, changes: &MeetingChanges) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "UPDATE meetings SET
                title = COALESCE(?, title),
                date = COALESCE(?, date),
                time = COALESCE(?, time),
                committee = COALESCE(?, committee),
                status = COALESCE(?, status),
                updated_at = ?
             WHERE id = ?",
        )
        .bind(changes.title.as_deref())
        .bind(changes.date.as_deref())
        .bind(changes.time.as_deref())
        .bind(changes.committee.as_deref())
        .bind(changes.status.map(|s| s.as_str()))
        .bind(now_timestamp())
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes the meeting and, by cascade, its agenda
    pub async fn delete(pool: &SqlitePool, id: &str) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM meetings WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn attach_agenda(pool: &SqlitePool, rows: Vec<MeetingRow>) -> sqlx::Result<Vec<MeetingView>> {
        let ids: Vec<String> = rows.iter().map(|r| r.meeting.id.clone()).collect();
        let mut items = AgendaItemRecord::list_for_meetings(pool, &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| MeetingView {
                agenda_items: items.remove(&row.meeting.id).unwrap_or_default(),
                meeting: row.meeting,
                municipality: row.municipality,
            })
            .collect())
    }
}

/// Database operations for agenda items
impl AgendaItemRecord {
    pub async fn insert<'e>(&self, executor: impl SqliteExecutor<'e>) -> sqlx::Result<()> {
        sqlx::query("INSERT INTO agenda_items (id, content, item_order, meeting_id) VALUES (?, ?, ?, ?)")
            .bind(&self.id)
            .bind(&self.content)
            .bind(self.order)
            .bind(&self.meeting_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn get_view(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<AgendaItemView>> {
        let row: Option<AgendaItemRow> =
            sqlx::query_as(&format!("{} WHERE a.id = ?", AGENDA_ITEM_WITH_MEETING_SELECT))
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(AgendaItemRow::into_view))
    }

    /// Page of agenda items in running order, optionally for one meeting
    pub async fn list(
        pool: &SqlitePool,
        meeting_id: Option<&str>,
        page: PageRequest,
    ) -> sqlx::Result<AgendaItemList> {
        let mut qb = QueryBuilder::<Sqlite>::new(AGENDA_ITEM_WITH_MEETING_SELECT);
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM agenda_items a");
        if let Some(meeting_id) = meeting_id {
            qb.push(" WHERE a.meeting_id = ").push_bind(meeting_id.to_string());
            count_qb.push(" WHERE a.meeting_id = ").push_bind(meeting_id.to_string());
        }
        qb.push(" ORDER BY a.item_order ASC, a.rowid ASC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows: Vec<AgendaItemRow> = qb.build_query_as().fetch_all(pool).await?;
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        Ok(AgendaItemList {
            agenda_items: rows.into_iter().map(AgendaItemRow::into_view).collect(),
            pagination: Pagination::new(total, page.limit, page.offset),
        })
    }

    /// Agenda items of several meetings keyed by meeting id, in running order
    pub async fn list_for_meetings(
        pool: &SqlitePool,
        meeting_ids: &[String],
    ) -> sqlx::Result<HashMap<String, Vec<AgendaItemRecord>>> {
        if meeting_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, content, item_order, meeting_id FROM agenda_items WHERE meeting_id IN ",
        );
        push_id_list(&mut qb, meeting_ids);
        qb.push(" ORDER BY item_order ASC, rowid ASC");

        let rows: Vec<AgendaItemRecord> = qb.build_query_as().fetch_all(pool).await?;
        Ok(group_by_parent(rows, |a| a.meeting_id.as_str()))
    }
}
