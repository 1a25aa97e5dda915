use std::io::{self, BufRead};
use std::process::exit;

use crossbeam_channel::unbounded;
use env_logger::{Builder, Env};
use time::OffsetDateTime;

use blockdex_core::controller::ViewStateController;
use blockdex_core::data::{elapsed_label, ContentType, DatasetView, Mode, UpdateRecord};
use blockdex_core::loader::{DirSource, RecordSource};
use blockdex_core::persist::{FsStore, KeyValueStore, MemoryStore, PersistenceGateway};
use blockdex_core::store::RecordStore;
use blockdex_core::urlcodec::UrlSink;

const ENV_LOG: &str = "BLOCKDEX_LOG";
const ENV_LOG_STYLE: &str = "BLOCKDEX_LOG_STYLE";

/// Stand-in for browser history in the headless driver.  The encoded query
/// is the shareable state, so surface it on every change.
struct LogSink;

impl UrlSink for LogSink {
    fn replace(&mut self, query: String) {
        log::debug!("url replace: ?{query}");
    }

    fn push(&mut self, query: String) {
        log::debug!("url push: ?{query}");
    }
}

fn main() {
    // Setup logging from the env variables, with defaults.
    Builder::from_env(
        Env::new()
            .filter_or(ENV_LOG, "info")
            .write_style(ENV_LOG_STYLE),
    )
    .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(data_dir) = args.get(1) else {
        eprintln!("usage: blockdex-cli <data-dir> [url-query]");
        exit(2);
    };
    let url_query = args.get(2).map(String::as_str).unwrap_or("");

    let source = DirSource::new(data_dir.as_str());
    let records = match source.load_records() {
        Ok(records) => records,
        Err(err) => {
            log::error!("{err}");
            exit(1);
        }
    };
    let store = RecordStore::load(records);

    let kv: Box<dyn KeyValueStore> = match FsStore::in_app_dirs() {
        Some(fs) => Box::new(fs),
        None => {
            log::warn!("no usable config directory, state will not be persisted");
            Box::new(MemoryStore::default())
        }
    };

    let (tick_send, tick_recv) = unbounded();
    let mut controller =
        ViewStateController::new(store, PersistenceGateway::new(kv), LogSink, tick_send);
    controller.reconcile_startup(url_query);
    fetch_if_pending(&mut controller, &source);
    print_view(&controller);

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::error!("stdin: {err}");
                break;
            }
        };
        // Ticks queue up while we block on input; old ones carry no data.
        let ticks = tick_recv.try_iter().count();
        if ticks > 0 && controller.state().mode == Mode::TimeSince {
            print_view(&controller);
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => {}
            ["q" | "quit"] => break,
            ["ls"] => print_view(&controller),
            ["search", rest @ ..] => controller.set_search(&rest.join(" ")),
            ["view", param] => match DatasetView::from_param(param) {
                Some(view) => controller.set_dataset_view(view),
                None => log::warn!("unknown view {param:?}"),
            },
            ["mode", param] => match Mode::from_param(param) {
                Some(Mode::Detail) => log::warn!("use `detail <kind> <id>` instead"),
                Some(mode) => controller.toggle_mode(mode),
                None if *param == "list" => controller.set_mode(Mode::List),
                None => log::warn!("unknown mode {param:?}"),
            },
            ["pick", slot @ ("1" | "2"), id] => {
                controller.pick_compare(if *slot == "1" { 0 } else { 1 }, id);
            }
            ["unpick", slot @ ("1" | "2")] => {
                controller.clear_compare(if *slot == "1" { 0 } else { 1 });
            }
            ["detail", kind, id] => controller.open_detail(kind, id, 0.0),
            ["close"] => {
                controller.close_detail();
            }
            ["show", ty, flag @ ("on" | "off")] => match ContentType::from_key(ty) {
                Some(ty) => controller.set_visibility(ty, *flag == "on"),
                None => log::warn!("unknown content type {ty:?}"),
            },
            ["dedup", flag @ ("on" | "off")] => {
                controller.set_remove_duplicates(*flag == "on");
            }
            ["fold", record_id, ty] => match ContentType::from_key(ty) {
                Some(ty) => controller.toggle_section(record_id, ty),
                None => log::warn!("unknown content type {ty:?}"),
            },
            ["growth"] => print_growth(&controller, false),
            ["growth", "total"] => print_growth(&controller, true),
            _ => log::warn!("unknown command {line:?}"),
        }

        fetch_if_pending(&mut controller, &source);
        print_view(&controller);
    }
}

/// Runs the lazy fetch the controller asked for, if any.  Synchronous here;
/// completions go through the same staleness check an async driver would hit.
fn fetch_if_pending<S: KeyValueStore, U: UrlSink>(
    controller: &mut ViewStateController<S, U>,
    source: &DirSource,
) {
    let Some(ticket) = controller.pending_fetch() else {
        return;
    };
    match ticket.mode {
        Mode::Stats => controller.complete_stats(ticket, source.load_stats()),
        Mode::TimeSince => controller.complete_time_since(ticket, source.load_time_since()),
        Mode::MaterialGroups => {
            controller.complete_material_groups(ticket, source.load_material_groups())
        }
        Mode::List | Mode::Compare | Mode::Detail => {}
    }
}

fn print_view<S: KeyValueStore, U: UrlSink>(controller: &ViewStateController<S, U>) {
    let state = controller.state();
    println!(
        "-- {} / {:?}{}",
        state.dataset_view.as_param(),
        state.mode,
        if state.search.is_empty() {
            String::new()
        } else {
            format!(" / search {:?}", state.search)
        }
    );
    match state.mode {
        Mode::List => {
            for record in controller.visible_records() {
                print_record(&record, state.remove_duplicates);
            }
        }
        Mode::Compare => {
            for (slot, resolved) in controller.resolved_compare().into_iter().enumerate() {
                match resolved {
                    Some(record) => {
                        println!("[{}]", slot + 1);
                        print_record(record, state.remove_duplicates);
                    }
                    None => println!("[{}] (nothing picked)", slot + 1),
                }
            }
        }
        Mode::Stats => {
            if let Some(stats) = controller.stats_data().resolved() {
                for point in &stats.points {
                    println!("{}: {}", point.label, point.value);
                }
            }
            print_growth(controller, true);
        }
        Mode::TimeSince => {
            if let Some(entries) = controller.time_since_data().resolved() {
                let now = OffsetDateTime::now_utc();
                for entry in entries {
                    match entry.parsed_date() {
                        Some(date) => {
                            println!("{}: {}", entry.name, elapsed_label(date, now))
                        }
                        None => println!("{}: (no date)", entry.name),
                    }
                }
            }
        }
        Mode::MaterialGroups => {
            if let Some(groups) = controller.material_groups_data().resolved() {
                for group in groups {
                    let names: Vec<&str> =
                        group.items.iter().map(|item| item.name.as_str()).collect();
                    println!("{}: {}", group.name, names.join(", "));
                }
            }
        }
        Mode::Detail => {
            if let Some(record) = controller.detail_record() {
                print_record(record, state.remove_duplicates);
            }
        }
    }
}

fn print_record(record: &UpdateRecord, remove_duplicates: bool) {
    println!(
        "{} ({} items)",
        record.name,
        record.total_count()
    );
    for (ty, items) in &record.added {
        if items.is_empty() {
            continue;
        }
        let shown: Vec<&str> = items
            .iter()
            .filter(|item| !(remove_duplicates && item.is_hidden()))
            .map(|item| item.name.as_str())
            .collect();
        println!("  {ty}: {}", shown.join(", "));
    }
}

fn print_growth<S: KeyValueStore, U: UrlSink>(
    controller: &ViewStateController<S, U>,
    cumulative: bool,
) {
    let growth = controller.growth(cumulative);
    for (i, label) in growth.labels.iter().enumerate() {
        let counts: Vec<String> = growth
            .series
            .iter()
            .filter(|(_, points)| points.iter().any(|n| *n > 0))
            .map(|(ty, points)| format!("{ty} {}", points[i]))
            .collect();
        println!("{label}: {}", counts.join(", "));
    }
}
