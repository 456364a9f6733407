#![no_std]
#![no_main]

use core::mem;

use aya_ebpf::{
    bindings::{xdp_action, TC_ACT_OK, TC_ACT_SHOT},
    helpers::bpf_ktime_get_ns,
    macros::{classifier, map, xdp},
    maps::{Array, HashMap, LpmTrie, LruHashMap, PerCpuArray, RingBuf},
    programs::{TcContext, XdpContext},
};
use guard_ebpf_common::{
    BlockValue, ConnKey, ConnValue, GeoAllowValue, IpStatsValue, LpmKey, PortStatsValue,
    RingEvent, WhitelistValue, ACTIVE_CONNECTIONS_MAX_ENTRIES, ACTIVE_CONNECTION_TTL_SECS,
    CONFIG_ENTRIES, CONFIG_IDX_HARD_BLOCKING, CONFIG_IDX_MAINTENANCE_MODE,
    CONFIG_IDX_RATE_LIMIT_PPS, GLOBAL_IDX_ALLOWED, GLOBAL_IDX_BLOCKED, GLOBAL_IDX_GEOIP_BLOCKED,
    GLOBAL_IDX_INVALID, GLOBAL_IDX_RATE_LIMITED, GLOBAL_IDX_TOTAL_BYTES,
    GLOBAL_IDX_TOTAL_PACKETS, GLOBAL_IDX_WHITELIST_HIT, GLOBAL_STATS_ENTRIES,
    IP_STATS_MAX_ENTRIES, PORT_STATS_MAX_ENTRIES, PROTO_ICMP, PROTO_TCP, PROTO_UDP,
    REASON_GEOIP, REASON_INVALID, REASON_RATE_LIMIT,
};
use network_types::{
    eth::{EthHdr, EtherType},
    ip::{IpProto, Ipv4Hdr},
    tcp::TcpHdr,
    udp::UdpHdr,
};

// ─── pinned maps, shared between the XDP and TC programs ──────────────

#[map(name = "ip_stats")]
static IP_STATS: LruHashMap<u32, IpStatsValue> =
    LruHashMap::with_max_entries(IP_STATS_MAX_ENTRIES, 0);

#[map(name = "blocked_ips")]
static BLOCKED_IPS: LpmTrie<LpmKey, BlockValue> =
    LpmTrie::with_max_entries(IP_STATS_MAX_ENTRIES, 0);

#[map(name = "white_list")]
static WHITE_LIST: LpmTrie<LpmKey, WhitelistValue> = LpmTrie::with_max_entries(1024, 0);

#[map(name = "geo_allowed")]
static GEO_ALLOWED: LpmTrie<LpmKey, GeoAllowValue> = LpmTrie::with_max_entries(1_000_000, 0);

#[map(name = "port_stats")]
static PORT_STATS: PerCpuArray<PortStatsValue> =
    PerCpuArray::with_max_entries(PORT_STATS_MAX_ENTRIES, 0);

#[map(name = "global_stats")]
static GLOBAL_STATS: PerCpuArray<u64> = PerCpuArray::with_max_entries(GLOBAL_STATS_ENTRIES, 0);

#[map(name = "config")]
static CONFIG: Array<u32> = Array::with_max_entries(CONFIG_ENTRIES, 0);

#[map(name = "active_connections")]
static ACTIVE_CONNECTIONS: HashMap<ConnKey, ConnValue> =
    HashMap::with_max_entries(ACTIVE_CONNECTIONS_MAX_ENTRIES, 0);

#[map(name = "events")]
static EVENTS: RingBuf = RingBuf::with_byte_size(1 << 18, 0);

// ─── small helpers ──────────────────────────────────────────────────

#[inline(always)]
fn bump_global(idx: u32, by: u64) {
    if let Some(slot) = GLOBAL_STATS.get_ptr_mut(idx) {
        unsafe { *slot += by };
    }
}

#[inline(always)]
fn config_u32(idx: u32) -> u32 {
    CONFIG.get(idx).copied().unwrap_or(0)
}

#[inline(always)]
fn push_event(src_addr: u32, reason: u32, now_ns: u64) {
    if let Some(mut entry) = EVENTS.reserve::<RingEvent>(0) {
        entry.write(RingEvent::new(src_addr, reason, now_ns));
        entry.submit(0);
    }
    // Ring full: drop silently. The drop is observed from userspace via
    // EBPF_RING_EVENTS_DROPPED_TOTAL, not from here.
}

#[inline(always)]
unsafe fn ptr_at<T>(ctx: &XdpContext, offset: usize) -> Result<*const T, ()> {
    let start = ctx.data();
    let end = ctx.data_end();
    let len = mem::size_of::<T>();
    if start + offset + len > end {
        return Err(());
    }
    Ok((start + offset) as *const T)
}

struct Parsed {
    src_addr: u32,
    dst_addr: u32,
    src_port: u16,
    dst_port: u16,
    proto: u8,
    pkt_len: u32,
}

#[inline(always)]
fn parse_ipv4(ctx: &XdpContext) -> Result<Parsed, ()> {
    let eth = unsafe { ptr_at::<EthHdr>(ctx, 0)? };
    if unsafe { (*eth).ether_type } != EtherType::Ipv4 {
        return Err(());
    }
    let ip = unsafe { ptr_at::<Ipv4Hdr>(ctx, EthHdr::LEN)? };
    let proto = unsafe { (*ip).proto };
    let (src_port, dst_port) = match proto {
        IpProto::Tcp => {
            let tcp = unsafe { ptr_at::<TcpHdr>(ctx, EthHdr::LEN + Ipv4Hdr::LEN)? };
            unsafe { (u16::from_be((*tcp).source), u16::from_be((*tcp).dest)) }
        }
        IpProto::Udp => {
            let udp = unsafe { ptr_at::<UdpHdr>(ctx, EthHdr::LEN + Ipv4Hdr::LEN)? };
            unsafe { (u16::from_be((*udp).source), u16::from_be((*udp).dest)) }
        }
        IpProto::Icmp => (0, 0),
        _ => return Err(()),
    };
    let proto_num = match proto {
        IpProto::Tcp => PROTO_TCP,
        IpProto::Udp => PROTO_UDP,
        IpProto::Icmp => PROTO_ICMP,
        _ => return Err(()),
    };
    Ok(Parsed {
        src_addr: u32::from_be(unsafe { (*ip).src_addr }),
        dst_addr: u32::from_be(unsafe { (*ip).dst_addr }),
        src_port,
        dst_port,
        proto: proto_num,
        pkt_len: u16::from_be(unsafe { (*ip).tot_len }) as u32,
    })
}

// ─── ingress: XDP ordered decision pipeline (§4.1) ─────────────────────

#[xdp]
pub fn guard_ingress(ctx: XdpContext) -> u32 {
    match try_guard_ingress(ctx) {
        Ok(ret) => ret,
        Err(()) => xdp_action::XDP_ABORTED,
    }
}

fn try_guard_ingress(ctx: XdpContext) -> Result<u32, ()> {
    let now_ns = unsafe { bpf_ktime_get_ns() };

    // Step 1: parse. Anything that doesn't decode as IPv4 TCP/UDP/ICMP
    // is counted as invalid and dropped; a parse failure never
    // propagates beyond this function.
    let pkt = match parse_ipv4(&ctx) {
        Ok(p) => p,
        Err(()) => {
            bump_global(GLOBAL_IDX_INVALID, 1);
            push_event(0, REASON_INVALID, now_ns);
            return Ok(xdp_action::XDP_DROP);
        }
    };

    // Step 2: per-IP / per-port / global counters.
    bump_global(GLOBAL_IDX_TOTAL_PACKETS, 1);
    bump_global(GLOBAL_IDX_TOTAL_BYTES, pkt.pkt_len as u64);
    update_ip_stats(pkt.src_addr, pkt.pkt_len as u64, now_ns);
    update_port_stats(pkt.dst_port, pkt.pkt_len as u64);

    // Step 3: maintenance mode short-circuit.
    if config_u32(CONFIG_IDX_MAINTENANCE_MODE) == 1 {
        return Ok(xdp_action::XDP_PASS);
    }

    // Step 4: whitelist, consulted before blocklist.
    let lpm_key = LpmKey::host(pkt.src_addr);
    if WHITE_LIST.get(&lpm_key).is_some() {
        bump_global(GLOBAL_IDX_WHITELIST_HIT, 1);
        return Ok(xdp_action::XDP_PASS);
    }

    // Step 5: return traffic for a connection opened on egress.
    let conn_key = ConnKey {
        src_addr: pkt.dst_addr,
        dst_addr: pkt.src_addr,
        src_port: pkt.dst_port,
        dst_port: pkt.src_port,
        proto: pkt.proto,
        _pad: [0; 3],
    };
    if unsafe { ACTIVE_CONNECTIONS.get(&conn_key) }.is_some() {
        return Ok(xdp_action::XDP_PASS);
    }

    // Step 6: blocklist. An expired, non-permanent entry is a miss;
    // userspace reaps it lazily.
    if let Some(block) = BLOCKED_IPS.get(&lpm_key) {
        if block.is_permanent() || now_ns < block.expires_at_ns {
            bump_global(GLOBAL_IDX_BLOCKED, 1);
            push_event(pkt.src_addr, block.reason, now_ns);
            return Ok(xdp_action::XDP_DROP);
        }
    }

    // Step 7: windowed rate limit.
    let rate_limit = config_u32(CONFIG_IDX_RATE_LIMIT_PPS);
    if rate_limit > 0 && over_rate_limit(pkt.src_addr, now_ns, rate_limit as u64) {
        bump_global(GLOBAL_IDX_RATE_LIMITED, 1);
        push_event(pkt.src_addr, REASON_RATE_LIMIT, now_ns);
        return Ok(xdp_action::XDP_DROP);
    }

    // Step 8: geo-allow. Userspace clears CONFIG_IDX_HARD_BLOCKING
    // whenever the trie is empty (the fail-safe), so a populated-trie
    // miss here is a genuine geo violation.
    if GEO_ALLOWED.get(&lpm_key).is_none() && geo_allow_populated() {
        bump_global(GLOBAL_IDX_GEOIP_BLOCKED, 1);
        push_event(pkt.src_addr, REASON_GEOIP, now_ns);
        if config_u32(CONFIG_IDX_HARD_BLOCKING) == 1 {
            return Ok(xdp_action::XDP_DROP);
        }
        return Ok(xdp_action::XDP_PASS);
    }

    // Step 9: allowed.
    bump_global(GLOBAL_IDX_ALLOWED, 1);
    Ok(xdp_action::XDP_PASS)
}

/// Whether the geo-allow trie currently holds any real country data.
/// Userspace always keeps a reserved `0.0.0.0/0` sentinel entry alive
/// while real CIDRs are loaded, and removes it when the geo database is
/// empty — this avoids walking the trie from the kernel path.
#[inline(always)]
fn geo_allow_populated() -> bool {
    GEO_ALLOWED.get(&LpmKey::new(0, [0; 4])).is_some()
}

#[inline(always)]
fn update_ip_stats(src_addr: u32, bytes: u64, now_ns: u64) {
    if let Some(stats) = IP_STATS.get_ptr_mut(&src_addr) {
        unsafe {
            (*stats).packets += 1;
            (*stats).bytes += bytes;
            (*stats).last_seen_ns = now_ns;
        }
        return;
    }
    let _ = IP_STATS.insert(
        &src_addr,
        &IpStatsValue {
            packets: 1,
            bytes,
            last_seen_ns: now_ns,
            blocked_flag: 0,
            window_start_ns: now_ns,
            window_count: 1,
            _pad: 0,
        },
        0,
    );
}

#[inline(always)]
fn update_port_stats(dst_port: u16, bytes: u64) {
    if let Some(stats) = PORT_STATS.get_ptr_mut(dst_port as u32) {
        unsafe {
            (*stats).packets += 1;
            (*stats).bytes += bytes;
        }
    }
}

/// 1-second bucketed packet-rate check against `rate_limit_pps`, tracked
/// inline in the per-IP stats entry rather than a separate map.
#[inline(always)]
fn over_rate_limit(src_addr: u32, now_ns: u64, limit_pps: u64) -> bool {
    const NS_PER_SEC: u64 = 1_000_000_000;
    if let Some(stats) = IP_STATS.get_ptr_mut(&src_addr) {
        unsafe {
            if now_ns.saturating_sub((*stats).window_start_ns) >= NS_PER_SEC {
                (*stats).window_start_ns = now_ns;
                (*stats).window_count = 1;
                return false;
            }
            (*stats).window_count += 1;
            (*stats).window_count as u64 > limit_pps
        }
    } else {
        false
    }
}

// ─── egress: TC connection tracker (§4.2) ──────────────────────────────

#[classifier]
pub fn guard_egress(ctx: TcContext) -> i32 {
    match try_guard_egress(ctx) {
        Ok(ret) => ret,
        Err(()) => TC_ACT_SHOT,
    }
}

fn try_guard_egress(ctx: TcContext) -> Result<i32, ()> {
    let now_ns = unsafe { bpf_ktime_get_ns() };

    let eth: EthHdr = ctx.load(0).map_err(|_| ())?;
    if eth.ether_type != EtherType::Ipv4 {
        return Ok(TC_ACT_OK);
    }
    let ip: Ipv4Hdr = ctx.load(EthHdr::LEN).map_err(|_| ())?;
    let proto = match ip.proto {
        IpProto::Tcp => PROTO_TCP,
        IpProto::Udp => PROTO_UDP,
        _ => return Ok(TC_ACT_OK),
    };
    let (src_port, dst_port) = match ip.proto {
        IpProto::Tcp => {
            let tcp: TcpHdr = ctx.load(EthHdr::LEN + Ipv4Hdr::LEN).map_err(|_| ())?;
            (u16::from_be(tcp.source), u16::from_be(tcp.dest))
        }
        IpProto::Udp => {
            let udp: UdpHdr = ctx.load(EthHdr::LEN + Ipv4Hdr::LEN).map_err(|_| ())?;
            (u16::from_be(udp.source), u16::from_be(udp.dest))
        }
        _ => (0, 0),
    };

    let key = ConnKey {
        src_addr: u32::from_be(ip.src_addr),
        dst_addr: u32::from_be(ip.dst_addr),
        src_port,
        dst_port,
        proto,
        _pad: [0; 3],
    };

    let created_ns = unsafe { ACTIVE_CONNECTIONS.get(&key) }
        .map(|existing| existing.created_ns)
        .unwrap_or(now_ns);
    let _ = ACTIVE_CONNECTIONS.insert(
        &key,
        &ConnValue {
            created_ns,
            last_ns: now_ns,
        },
        0,
    );

    Ok(TC_ACT_OK)
}

#[allow(dead_code)]
fn is_stale(conn: &ConnValue, now_ns: u64) -> bool {
    now_ns.saturating_sub(conn.last_ns) > ACTIVE_CONNECTION_TTL_SECS * 1_000_000_000
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}
