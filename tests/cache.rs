//! End-to-end scenarios driving a cache through its whole life cycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dncache::base::{Class, Name, Rtype, Ttl};
use dncache::cache::{
    Cache, Clock, Config, FakeClock, LookupFlags, Record, RecordData,
};

fn cache() -> Cache<FakeClock> {
    Cache::with_clock(Config::new(), FakeClock::new())
}

fn name(name: &str) -> Name {
    name.parse().unwrap()
}

fn a_record(cache: &Cache<FakeClock>, owner: &str, addr: [u8; 4]) -> Record {
    let dn = cache.dn_lookup(&name(owner), Class::IN, true).unwrap();
    Record::new(
        dn,
        Class::IN,
        Ttl::from_secs(3600),
        RecordData::A(addr.into()),
    )
}

#[test]
fn sweep_reclaims_idle_names() {
    let mut config = Config::new();
    config.set_target_dn_count(1);
    config.set_min_idle(Duration::from_secs(60));
    let cache = Cache::with_clock(config, FakeClock::new());

    for i in 0..4 {
        let owner = format!("host{}.example", i);
        let rr = a_record(&cache, &owner, [192, 0, 2, i]);
        cache.rr_attach(vec![rr], false);
    }
    assert_eq!(cache.live_names(), 4);

    // Make everything idle, then force sweeps. The idle threshold
    // starts at the week-long ceiling and halves every sweep while the
    // table is over target, so it takes several rounds before the
    // records age out and the then-empty names get reclaimed.
    cache.clock().adjust_time(Duration::from_secs(2000));
    for _ in 0..12 {
        cache.age_all(true);
    }
    assert_eq!(cache.live_names(), 0);
    let stats = cache.stats();
    assert_eq!(stats.evicted_records, 4);
    assert_eq!(stats.freed_names, 4);
}

#[test]
fn threshold_floor_limits_aggression() {
    let mut config = Config::new();
    config.set_target_dn_count(1);
    config.set_min_idle(Duration::from_secs(60));
    config.set_reserve_idle(Duration::from_secs(1));
    let cache = Cache::with_clock(config, FakeClock::new());

    for i in 0..3 {
        let owner = format!("host{}.example", i);
        let rr = a_record(&cache, &owner, [192, 0, 2, i]);
        cache.rr_attach(vec![rr], false);
    }

    // Over target, so every forced sweep halves the idle threshold.
    // Unclamped, twenty halvings of the week-long ceiling would leave a
    // sub-second threshold and evict these 30-seconds-idle records; the
    // floor holds it at a minute and they must all survive.
    cache.clock().adjust_time(Duration::from_secs(30));
    for _ in 0..20 {
        cache.age_all(true);
    }
    assert_eq!(cache.live_names(), 3);
    assert_eq!(cache.stats().evicted_records, 0);

    // Past the floor the records age out like any others.
    cache.clock().adjust_time(Duration::from_secs(100));
    cache.age_all(true);
    assert_eq!(cache.live_names(), 0);
    assert_eq!(cache.stats().evicted_records, 3);
    assert_eq!(cache.stats().freed_names, 3);
}

#[test]
fn recently_referenced_names_survive_aggressive_sweeps() {
    let mut config = Config::new();
    config.set_target_dn_count(1);
    let cache = Cache::with_clock(config, FakeClock::new());

    let rr = a_record(&cache, "busy.example", [192, 0, 2, 1]);
    let dn = rr.owner();
    cache.rr_attach(vec![rr], false);

    // Stay inside the reserve window however low the threshold drops.
    for _ in 0..20 {
        cache.clock().adjust_time(Duration::from_secs(100));
        cache.dn_lookup(&name("busy.example"), Class::IN, false);
        cache.age_all(true);
    }
    assert_eq!(
        cache.rr_lookup(dn, Rtype::A, LookupFlags::default()).len(),
        1
    );
}

#[test]
fn referenced_targets_survive_sweeps() {
    let cache = cache();
    let target = cache
        .dn_lookup(&name("host.example"), Class::IN, true)
        .unwrap();
    let reverse = cache
        .dn_lookup(&name("1.2.0.192.in-addr.arpa"), Class::IN, true)
        .unwrap();
    let mut ptr = Record::new(
        reverse,
        Class::IN,
        Ttl::from_secs(300),
        RecordData::Ptr(target),
    );
    ptr.set_db(true);
    cache.rr_attach(vec![ptr], false);
    // An unrelated record-less name for contrast.
    cache.dn_lookup(&name("stray.example"), Class::IN, true);

    cache.clock().adjust_time(Duration::from_secs(4000));
    cache.age_all(true);

    // The PTR's target is pinned by reachability, the stray is not.
    assert!(cache.name_of(target).is_some());
    assert!(cache.name_of(reverse).is_some());
    assert!(cache
        .dn_lookup(&name("stray.example"), Class::IN, false)
        .is_none());
    assert_eq!(cache.live_names(), 2);
}

#[test]
fn never_age_pins_transitively() {
    let mut config = Config::new();
    config.set_target_dn_count(1);
    config.set_min_idle(Duration::from_secs(60));
    let cache = Cache::with_clock(config, FakeClock::new());

    let exchange = cache
        .dn_lookup(&name("mail.example"), Class::IN, true)
        .unwrap();
    let owner = cache
        .dn_lookup(&name("example"), Class::IN, true)
        .unwrap();
    cache.rr_attach(
        vec![Record::new(
            owner,
            Class::IN,
            Ttl::from_secs(300),
            RecordData::Mx {
                preference: 10,
                exchange,
            },
        )],
        false,
    );
    cache.never_age(owner);

    // Idle past expiry and past any threshold, then sweep hard.
    cache.clock().adjust_time(Duration::from_secs(700_000));
    for _ in 0..15 {
        cache.age_all(true);
    }

    // Pinned names keep their records and their referenced names.
    assert_eq!(
        cache.rr_lookup(owner, Rtype::MX, LookupFlags::default()).len(),
        1
    );
    assert!(cache.name_of(exchange).is_some());
}

#[test]
fn reload_cycle_replaces_database_records() {
    let cache = cache();
    cache.add_zone(name("example"), Ttl::from_hours(1));
    let dn = cache
        .dn_lookup(&name("www.example"), Class::IN, true)
        .unwrap();

    let mut rr = a_record(&cache, "www.example", [192, 0, 2, 1]);
    rr.set_db(true);
    cache.rr_attach(vec![rr], false);
    cache.auth_db();

    let answer = cache.rr_lookup(dn, Rtype::A, LookupFlags::default());
    assert_eq!(answer.len(), 1);
    assert!(answer[0].is_auth());
    assert!(answer[0].ttl() >= Ttl::from_hours(1));

    // Reload: the old address is not in the new configuration. The
    // replacement claims a TTL below the zone's floor.
    cache.age_db();
    let mut rr = Record::new(
        dn,
        Class::IN,
        Ttl::from_secs(60),
        RecordData::A([192, 0, 2, 2].into()),
    );
    rr.set_db(true);
    cache.rr_attach(vec![rr], false);
    cache.auth_db();

    let answer = cache.rr_lookup(dn, Rtype::A, LookupFlags::default());
    assert_eq!(answer.len(), 1);
    assert!(answer[0].is_auth());
    assert_eq!(answer[0].ttl(), Ttl::from_hours(1));
    assert_eq!(
        answer[0].data(),
        Some(&RecordData::A([192, 0, 2, 2].into()))
    );
}

#[test]
fn record_lists_stay_grouped_and_auth_first() {
    let cache = cache();
    let dn = cache
        .dn_lookup(&name("host.example"), Class::IN, true)
        .unwrap();
    let ns1 = cache
        .dn_lookup(&name("ns1.example"), Class::IN, true)
        .unwrap();
    let ns2 = cache
        .dn_lookup(&name("ns2.example"), Class::IN, true)
        .unwrap();
    let ttl = Ttl::from_secs(3600);

    // Interleave types and authority deliberately.
    let batches: [(RecordData, bool); 6] = [
        (RecordData::A([192, 0, 2, 1].into()), false),
        (RecordData::Ns(ns1), true),
        (RecordData::A([192, 0, 2, 2].into()), true),
        (
            RecordData::Mx {
                preference: 10,
                exchange: ns1,
            },
            false,
        ),
        (RecordData::Ns(ns2), false),
        (RecordData::A([192, 0, 2, 3].into()), false),
    ];
    for (data, auth) in batches {
        cache.rr_attach(vec![Record::new(dn, Class::IN, ttl, data)], auth);
    }

    // The snapshot prints records in list order: one contiguous group
    // per type, authoritative entries heading their group.
    let mut out = Vec::new();
    cache.dump(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let order: Vec<(String, bool)> = text
        .lines()
        .filter(|line| line.starts_with("    "))
        .map(|line| {
            let rtype = line.split_whitespace().nth(2).unwrap();
            let flags = line.rsplit(';').next().unwrap();
            (rtype.to_string(), flags.contains(" auth"))
        })
        .collect();
    assert_eq!(
        order,
        vec![
            ("A".to_string(), true),
            ("A".to_string(), false),
            ("A".to_string(), false),
            ("NS".to_string(), true),
            ("NS".to_string(), false),
            ("MX".to_string(), false),
        ]
    );
}

#[test]
fn over_target_table_sweeps_without_force() {
    // 5000 isolated record-less names against the default 4000 target:
    // a non-forced sweep must run and reclaim them all.
    let cache = cache();
    for i in 0..5000 {
        cache
            .dn_lookup(&name(&format!("host{}.example", i)), Class::IN, true)
            .unwrap();
    }
    assert_eq!(cache.live_names(), 5000);

    cache.age_all(false);
    assert_eq!(cache.live_names(), 0);
    assert_eq!(cache.stats().freed_names, 5000);
}

#[test]
fn last_worker_out_runs_refresh_and_sweep() {
    let cache = Arc::new(cache());
    let refreshes = Arc::new(AtomicUsize::new(0));

    let counter = refreshes.clone();
    cache.set_refresh_hook(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    cache.get_activity(false);
    cache.get_activity(false);
    cache.request_refresh();

    // The first worker out is not the last; nothing may run yet.
    cache.put_activity(false);
    assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    assert_eq!(cache.stats().sweeps, 0);

    cache.put_activity(false);
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().sweeps, 1);

    // The gate is open again afterwards.
    let entrant = {
        let cache = cache.clone();
        thread::spawn(move || {
            cache.get_activity(false);
            cache.put_activity(false);
        })
    };
    entrant.join().unwrap();
    // A refresh only runs when requested.
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
}

#[test]
fn synthesized_ptrs_cover_the_network() {
    let cache = cache();
    let inside = a_record(&cache, "inside.example", [192, 0, 2, 7]);
    let inside_dn = inside.owner();
    let outside = a_record(&cache, "outside.example", [198, 51, 100, 7]);
    cache.rr_attach(vec![inside, outside], false);

    cache.synthesize_ptrs(
        [192, 0, 2, 0].into(),
        [255, 255, 255, 0].into(),
        &name("in-addr.arpa"),
    );

    let reverse = cache
        .dn_lookup(&name("7.2.0.192.in-addr.arpa"), Class::IN, false)
        .expect("reverse name was not synthesized");
    let answer =
        cache.rr_lookup(reverse, Rtype::PTR, LookupFlags::default());
    assert_eq!(answer.len(), 1);
    assert_eq!(answer[0].data(), Some(&RecordData::Ptr(inside_dn)));

    // The address outside the network got no reverse mapping.
    assert!(cache
        .dn_lookup(&name("7.100.51.198.in-addr.arpa"), Class::IN, false)
        .is_none());
}

#[test]
fn dump_lists_names_and_records() {
    let cache = cache();
    let rr = a_record(&cache, "host.example", [192, 0, 2, 1]);
    cache.rr_attach(vec![rr], false);

    let mut out = Vec::new();
    cache.dump(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("host.example"));
    assert!(text.contains("192.0.2.1"));

    let mut out = Vec::new();
    cache.write_stats(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("names-live 1"));
}

#[test]
fn idn_names_share_handles_with_their_ascii_form() {
    let cache = cache();
    let via_idn = cache
        .idn_lookup("bücher.example", Class::IN, true)
        .unwrap()
        .unwrap();
    let via_ascii = cache
        .dn_lookup(&name("xn--bcher-kva.example"), Class::IN, false)
        .unwrap();
    assert_eq!(via_idn, via_ascii);
}
