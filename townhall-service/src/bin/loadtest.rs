use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use anyhow::Context;
use rand::{rngs::ThreadRng, seq::SliceRandom, thread_rng, Rng};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tokio::sync::Semaphore;
use tokio::time::{interval, MissedTickBehavior};

const LABELS: [&str; 4] = ["towns", "town_detail", "threads", "vote"];

/// One request to issue
struct Planned {
    method: Method,
    url: String,
    body: Option<Value>,
    label_idx: usize,
}

struct Targets {
    base_url: String,
    slugs: Vec<String>,
    municipality_ids: Vec<String>,
    thread_ids: Vec<String>,
}

impl Targets {
    fn plan(&self, name: &str, label_idx: usize, rng: &mut ThreadRng) -> Option<Planned> {
        let get = |url: String| Planned {
            method: Method::GET,
            url,
            body: None,
            label_idx,
        };
        match name {
            "towns" => Some(get(format!("{}/api/towns", self.base_url))),
            "town_detail" => {
                let slug = self.slugs.choose(rng)?;
                Some(get(format!("{}/api/towns/{}", self.base_url, slug)))
            }
            "threads" => {
                let id = self.municipality_ids.choose(rng)?;
                let offset = rng.gen_range(0..3) * 10;
                Some(get(format!(
                    "{}/api/forum/threads?municipalityId={}&limit=10&offset={}",
                    self.base_url, id, offset
                )))
            }
            _ => {
                let id = self.thread_ids.choose(rng)?;
                let vote_type = if rng.gen_bool(0.8) { "up" } else { "down" };
                Some(Planned {
                    method: Method::POST,
                    url: format!("{}/api/forum/vote", self.base_url),
                    body: Some(json!({ "threadId": id, "voteType": vote_type })),
                    label_idx,
                })
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Quick-and-dirty CLI via envs
    let base_url = std::env::var("BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
    let db_path = std::env::var("DB_PATH").unwrap_or_else(|_| "./townhall.db".to_string());
    let duration_secs: u64 = std::env::var("DURATION_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(30);
    let concurrency: usize = std::env::var("CONCURRENCY").ok().and_then(|v| v.parse().ok()).unwrap_or(64);
    let target_rps: Option<u64> = std::env::var("TARGET_RPS").ok().and_then(|v| v.parse().ok()).filter(|&n| n > 0);
    // Endpoint selection: comma list of towns,town_detail,threads,vote
    let endpoints_csv = std::env::var("ENDPOINTS").unwrap_or_else(|_| "towns,town_detail,threads".to_string());
    let selected_labels: Vec<String> = endpoints_csv
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| LABELS.contains(&s.as_str()))
        .collect();
    if selected_labels.is_empty() {
        anyhow::bail!("ENDPOINTS produced no valid entries");
    }
    // Optional weights like "towns=1,town_detail=3,vote=2"
    let weights_map: HashMap<String, u32> = std::env::var("ENDPOINT_WEIGHTS")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|kv| {
                    let mut it = kv.split('=');
                    let k = it.next()?.trim().to_lowercase();
                    let v: u32 = it.next()?.trim().parse().ok()?;
                    Some((k, v.max(1)))
                })
                .collect()
        })
        .unwrap_or_default();
    // Sampling bag of endpoint indices per weight
    let mut pick_bag: Vec<usize> = Vec::new();
    for (idx, name) in selected_labels.iter().enumerate() {
        let w = *weights_map.get(name).unwrap_or(&1);
        for _ in 0..w {
            pick_bag.push(idx);
        }
    }

    println!("BASE_URL={}", base_url);
    println!("DB_PATH={}", db_path);
    println!(
        "DURATION_SECS={} CONCURRENCY={} {}",
        duration_secs,
        concurrency,
        target_rps
            .map(|r| format!("TARGET_RPS={}", r))
            .unwrap_or_else(|| "(best-effort firehose)".to_string())
    );
    println!("ENDPOINTS={}", selected_labels.join(","));

    // Load ids from the service's database
    let pool = SqlitePool::connect(&format!("sqlite:{}", db_path))
        .await
        .with_context(|| format!("opening {}", db_path))?;
    let towns: Vec<(String, String)> = sqlx::query_as("SELECT id, slug FROM municipalities LIMIT 5000")
        .fetch_all(&pool)
        .await?;
    let thread_ids: Vec<String> = sqlx::query_scalar("SELECT id FROM forum_threads LIMIT 5000")
        .fetch_all(&pool)
        .await?;
    pool.close().await;

    println!("Loaded {} towns, {} threads", towns.len(), thread_ids.len());
    if towns.is_empty() {
        anyhow::bail!("No towns found in DB at {}; run `townhall-cli seed` first", db_path);
    }

    let targets = Targets {
        base_url,
        municipality_ids: towns.iter().map(|(id, _)| id.clone()).collect(),
        slugs: towns.into_iter().map(|(_, slug)| slug).collect(),
        thread_ids,
    };

    let client = Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(10_000)
        .tcp_nodelay(true)
        .timeout(Duration::from_secs(15))
        .build()?;

    let start_at = Instant::now();
    let end_at = start_at + Duration::from_secs(duration_secs);
    let sem = Arc::new(Semaphore::new(concurrency));
    let mut rng = thread_rng();

    let mut tasks = Vec::with_capacity(concurrency * 2);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<(bool, u128, usize)>();
    let issued = Arc::new(AtomicU64::new(0));

    let labels_for_stats = selected_labels.clone();
    let issued_for_stats = issued.clone();
    let stats_handle = tokio::spawn(async move {
        let mut ok = 0u64;
        let mut err = 0u64;
        let mut ok_per: Vec<u64> = vec![0; labels_for_stats.len()];
        let mut err_per: Vec<u64> = vec![0; labels_for_stats.len()];
        let mut latencies_ms: Vec<u128> = Vec::new();
        while let Some((success, ms, idx)) = rx.recv().await {
            if success {
                ok += 1;
                ok_per[idx] += 1;
            } else {
                err += 1;
                err_per[idx] += 1;
            }
            latencies_ms.push(ms);
        }
        latencies_ms.sort_unstable();
        let p = |q: f64| -> u128 {
            if latencies_ms.is_empty() {
                return 0;
            }
            let idx = ((latencies_ms.len() as f64 - 1.0) * q).round() as usize;
            latencies_ms[idx]
        };
        let completed = ok + err;
        let issued_total = issued_for_stats.load(Ordering::Relaxed);
        let elapsed = start_at.elapsed().as_secs_f64();
        let qps = if elapsed > 0.0 { completed as f64 / elapsed } else { 0.0 };
        println!(
            "Summary: issued={} completed={} ok={} err={} p50={}ms p90={}ms p99={}ms qps={:.1}",
            issued_total,
            completed,
            ok,
            err,
            p(0.50),
            p(0.90),
            p(0.99),
            qps
        );
        for (i, name) in labels_for_stats.iter().enumerate() {
            println!("  {}: ok={} err={} total={}", name, ok_per[i], err_per[i], ok_per[i] + err_per[i]);
        }
    });

    let mut ticker = target_rps.map(|rps| {
        let mut t = interval(Duration::from_nanos(1_000_000_000 / rps));
        t.set_missed_tick_behavior(MissedTickBehavior::Delay);
        t
    });

    // Producer loop
    while Instant::now() < end_at {
        if let Some(t) = ticker.as_mut() {
            t.tick().await;
        }
        let permit = sem.clone().acquire_owned().await?;

        let Some(&idx) = pick_bag.choose(&mut rng) else {
            break;
        };
        let Some(planned) = targets.plan(&selected_labels[idx], idx, &mut rng) else {
            continue;
        };
        issued.fetch_add(1, Ordering::Relaxed);

        let client_ref = client.clone();
        let tx_ref = tx.clone();
        let task = tokio::spawn(async move {
            let started = Instant::now();
            let mut request = client_ref.request(planned.method, &planned.url);
            if let Some(body) = &planned.body {
                request = request.json(body);
            }
            let resp = request.send().await;
            let elapsed = started.elapsed().as_millis();
            let ok = match &resp {
                Ok(r) => r.status().is_success(),
                Err(_) => false,
            };
            let _ = tx_ref.send((ok, elapsed, planned.label_idx));
            drop(permit);
            if !ok {
                match resp {
                    Ok(r) => eprintln!("err {}ms {} status={}", elapsed, planned.url, r.status()),
                    Err(e) => eprintln!("err {}ms {} net={}", elapsed, planned.url, e),
                }
            }
        });
        // Paced runs are bounded by the ticker; only the firehose keeps handles
        if ticker.is_none() {
            tasks.push(task);
        }
    }

    // Close the stats channel so the summary prints
    drop(tx);

    for t in tasks {
        let _ = t.await;
    }

    // Ensure stats are printed before exit
    let _ = stats_handle.await;

    Ok(())
}
