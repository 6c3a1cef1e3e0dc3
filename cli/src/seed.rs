//! Demo data for local development
//!
//! Seeding is idempotent per town: a town whose slug already exists is
//! skipped together with all of its children.

use anyhow::Result;
use log::info;
use townhall_service::database::models::{
    AgendaItemRecord, BudgetCategoryRecord, BudgetRecord, ForumThreadRecord, MeetingRecord,
    MeetingStatus, MunicipalityRecord, ThreadTagRecord,
};
use townhall_service::database::Database;
use townhall_service::utils::{new_id, normalize_meeting_date, now_timestamp};

use crate::cli_types::SeedSet;

pub struct SeedTown {
    pub name: &'static str,
    pub state: &'static str,
    pub zip_code: &'static str,
    pub population: i64,
    pub is_serviced: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub slug: &'static str,
    /// 2024 total and `(name, amount, color)` categories
    pub budget: Option<(f64, &'static [(&'static str, f64, &'static str)])>,
    pub meeting: Option<SeedMeeting>,
    pub thread: Option<SeedThread>,
}

pub struct SeedMeeting {
    pub title: &'static str,
    pub date: &'static str,
    pub time: &'static str,
    pub committee: &'static str,
    pub agenda: &'static [&'static str],
}

pub struct SeedThread {
    pub title: &'static str,
    pub content: &'static str,
    pub author: &'static str,
    pub upvotes: i64,
    pub downvotes: i64,
    pub tags: &'static [&'static str],
}

const BUDGET_YEAR: i64 = 2024;

const fn town(
    name: &'static str,
    state: &'static str,
    zip_code: &'static str,
    population: i64,
    is_serviced: bool,
    coordinates: (f64, f64),
    slug: &'static str,
) -> SeedTown {
    SeedTown {
        name,
        state,
        zip_code,
        population,
        is_serviced,
        latitude: coordinates.0,
        longitude: coordinates.1,
        slug,
        budget: None,
        meeting: None,
        thread: None,
    }
}

pub fn basic_towns() -> Vec<SeedTown> {
    vec![
        town("Somerville", "NJ", "08876", 12423, true, (40.5751, -74.6097), "somerville-nj"),
        town("Princeton", "NJ", "08540", 31161, true, (40.3573, -74.6672), "princeton-nj"),
        town("Madison", "WI", "53703", 259680, true, (43.0731, -89.4012), "madison-wi"),
        town("Burlington", "VT", "05401", 44743, true, (44.4759, -73.2121), "burlington-vt"),
    ]
}

pub fn demo_towns() -> Vec<SeedTown> {
    let mut towns = basic_towns();

    let budgets: [(f64, &'static [(&'static str, f64, &'static str)]); 4] = [
        (
            25_000_000.0,
            &[
                ("Public Safety", 8_500_000.0, "#2C6E49"),
                ("Education", 7_200_000.0, "#D94F30"),
                ("Infrastructure", 4_800_000.0, "#3A4F68"),
                ("Parks & Recreation", 2_100_000.0, "#8B5A3C"),
                ("Administration", 1_400_000.0, "#6B7280"),
                ("Other", 1_000_000.0, "#9CA3AF"),
            ],
        ),
        (
            45_000_000.0,
            &[
                ("Public Safety", 12_000_000.0, "#2C6E49"),
                ("Education", 15_000_000.0, "#D94F30"),
                ("Infrastructure", 8_000_000.0, "#3A4F68"),
                ("Parks & Recreation", 5_000_000.0, "#8B5A3C"),
                ("Administration", 3_000_000.0, "#6B7280"),
                ("Other", 2_000_000.0, "#9CA3AF"),
            ],
        ),
        (
            180_000_000.0,
            &[
                ("Public Safety", 45_000_000.0, "#2C6E49"),
                ("Education", 60_000_000.0, "#D94F30"),
                ("Infrastructure", 35_000_000.0, "#3A4F68"),
                ("Parks & Recreation", 20_000_000.0, "#8B5A3C"),
                ("Administration", 12_000_000.0, "#6B7280"),
                ("Other", 8_000_000.0, "#9CA3AF"),
            ],
        ),
        (
            75_000_000.0,
            &[
                ("Public Safety", 20_000_000.0, "#2C6E49"),
                ("Education", 25_000_000.0, "#D94F30"),
                ("Infrastructure", 15_000_000.0, "#3A4F68"),
                ("Parks & Recreation", 8_000_000.0, "#8B5A3C"),
                ("Administration", 5_000_000.0, "#6B7280"),
                ("Other", 2_000_000.0, "#9CA3AF"),
            ],
        ),
    ];
    for (town, budget) in towns.iter_mut().zip(budgets) {
        town.budget = Some(budget);
    }

    // Somerville gets the full town page
    towns[0].meeting = Some(SeedMeeting {
        title: "City Council Regular Meeting",
        date: "2024-02-15",
        time: "7:00 PM",
        committee: "City Council",
        agenda: &[
            "Approval of previous meeting minutes",
            "Budget review for Q1 2024",
            "Park development proposal discussion",
            "Public comments",
        ],
    });
    towns[0].thread = Some(SeedThread {
        title: "New Park Development on Main Street",
        content: "Has anyone heard about the proposed park development? I think it would greatly benefit our community.",
        author: "Sarah M.",
        upvotes: 23,
        downvotes: 2,
        tags: &["Budget", "Parks"],
    });

    towns.extend([
        town("Austin", "TX", "73301", 965872, false, (30.2672, -97.7431), "austin-tx"),
        town("Portland", "OR", "97201", 652503, false, (45.5152, -122.6784), "portland-or"),
        town("Boulder", "CO", "80301", 107353, false, (40.0150, -105.2705), "boulder-co"),
        town("Ann Arbor", "MI", "48103", 123851, false, (42.2808, -83.7430), "ann-arbor-mi"),
    ]);
    towns
}

pub fn towns_for(set: SeedSet) -> Vec<SeedTown> {
    match set {
        SeedSet::Basic => basic_towns(),
        SeedSet::Demo => demo_towns(),
    }
}

/// Insert every town not already present; returns how many were created
pub async fn seed(db: &Database, towns: &[SeedTown]) -> Result<usize> {
    let mut tx = db.pool().begin().await?;
    let mut created = 0;

    for seed in towns {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM municipalities WHERE slug = ?")
            .bind(seed.slug)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_some() {
            info!("Skipping {}, {} (already present)", seed.name, seed.state);
            continue;
        }

        let now = now_timestamp();
        let municipality = MunicipalityRecord {
            id: new_id(),
            name: seed.name.to_string(),
            state: seed.state.to_string(),
            zip_code: seed.zip_code.to_string(),
            population: seed.population,
            is_serviced: seed.is_serviced,
            latitude: seed.latitude,
            longitude: seed.longitude,
            slug: seed.slug.to_string(),
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        municipality.insert(&mut *tx).await?;

        if let Some((total, categories)) = seed.budget {
            let budget = BudgetRecord {
                id: new_id(),
                year: BUDGET_YEAR,
                total_budget: total,
                municipality_id: municipality.id.clone(),
                created_at: now.clone(),
                updated_at: now.clone(),
            };
            budget.insert(&mut *tx).await?;
            for (name, amount, color) in categories {
                BudgetCategoryRecord {
                    id: new_id(),
                    name: name.to_string(),
                    amount: *amount,
                    color: color.to_string(),
                    budget_id: budget.id.clone(),
                }
                .insert(&mut *tx)
                .await?;
            }
        }

        if let Some(m) = &seed.meeting {
            let meeting = MeetingRecord {
                id: new_id(),
                title: m.title.to_string(),
                date: normalize_meeting_date(m.date).map_err(|e| anyhow::anyhow!(e.to_string()))?,
                time: m.time.to_string(),
                committee: m.committee.to_string(),
                status: MeetingStatus::Upcoming.to_string(),
                municipality_id: municipality.id.clone(),
                created_at: now.clone(),
                updated_at: now.clone(),
            };
            meeting.insert(&mut *tx).await?;
            for (i, content) in m.agenda.iter().enumerate() {
                AgendaItemRecord {
                    id: new_id(),
                    content: content.to_string(),
                    order: i as i64 + 1,
                    meeting_id: meeting.id.clone(),
                }
                .insert(&mut *tx)
                .await?;
            }
        }

        if let Some(t) = &seed.thread {
            let thread = ForumThreadRecord {
                id: new_id(),
                title: t.title.to_string(),
                content: t.content.to_string(),
                author: t.author.to_string(),
                upvotes: t.upvotes,
                downvotes: t.downvotes,
                municipality_id: municipality.id.clone(),
                created_at: now.clone(),
                updated_at: now.clone(),
            };
            thread.insert(&mut *tx).await?;
            for name in t.tags {
                ThreadTagRecord {
                    id: new_id(),
                    name: name.to_string(),
                    thread_id: thread.id.clone(),
                }
                .insert(&mut *tx)
                .await?;
            }
        }

        info!("Created {}, {}", seed.name, seed.state);
        created += 1;
    }

    tx.commit().await?;
    Ok(created)
}
