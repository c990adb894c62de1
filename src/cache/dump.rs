//! Writing text snapshots of the cache.
//!
//! Purely operational tooling: a formatted traversal of the whole table
//! and a dump of the aggregate counters, both written under the cache
//! lock. Neither is performance critical.

use std::io;

use super::clock::Timestamp;
use super::record::{Payload, Record, RecordData};
use super::table::DnHandle;
use super::CacheInner;

impl CacheInner {
    /// Returns the name behind a handle for display purposes.
    pub(super) fn dn_name(&self, handle: DnHandle) -> &str {
        self.table
            .get(handle)
            .map(|entry| entry.name.as_str())
            .unwrap_or("<gone>")
    }

    /// Writes a text snapshot of the whole table.
    pub(super) fn dump<W: io::Write>(
        &self,
        target: &mut W,
        now: Timestamp,
    ) -> io::Result<()> {
        writeln!(
            target,
            "; cache snapshot at {}s, {} names live",
            now,
            self.table.live()
        )?;
        for handle in self.table.handles() {
            let Some(entry) = self.table.get(handle) else {
                continue;
            };
            writeln!(
                target,
                "{} {}\t; referenced={}s mark={:#04b}",
                entry.name, entry.class, entry.referenced, entry.mark
            )?;
            for rr in &entry.records {
                self.write_record(target, rr, now)?;
            }
        }
        Ok(())
    }

    /// Writes one record line.
    fn write_record<W: io::Write>(
        &self,
        target: &mut W,
        rr: &Record,
        now: Timestamp,
    ) -> io::Result<()> {
        write!(target, "    {} {} {}", rr.ttl(), rr.class(), rr.rtype())?;
        match rr.payload() {
            Payload::Negative { rcode, soa } => {
                write!(target, " <negative {}", rcode)?;
                if let Some(soa) = soa {
                    write!(target, " soa={}", self.dn_name(*soa))?;
                }
                write!(target, ">")?;
            }
            Payload::Positive(data) => {
                self.write_data(target, data)?;
            }
        }
        write!(target, "\t;")?;
        if rr.is_db() {
            write!(target, " db")?;
        }
        if rr.is_auth() {
            write!(target, " auth")?;
        }
        if rr.is_expired(now) {
            write!(target, " expired")?;
        }
        writeln!(target, " expire={}s", rr.expire())
    }

    /// Writes the data of a positive record.
    fn write_data<W: io::Write>(
        &self,
        target: &mut W,
        data: &RecordData,
    ) -> io::Result<()> {
        match *data {
            RecordData::A(addr) => write!(target, " {}", addr),
            RecordData::Aaaa(addr) => write!(target, " {}", addr),
            RecordData::Ns(target_dn)
            | RecordData::Cname(target_dn)
            | RecordData::Ptr(target_dn)
            | RecordData::Mb(target_dn)
            | RecordData::Mg(target_dn)
            | RecordData::Mr(target_dn)
            | RecordData::Md(target_dn)
            | RecordData::Mf(target_dn) => {
                write!(target, " {}", self.dn_name(target_dn))
            }
            RecordData::Mx {
                preference,
                exchange,
            } => {
                write!(target, " {} {}", preference, self.dn_name(exchange))
            }
            RecordData::Minfo { rmailbx, emailbx } => write!(
                target,
                " {} {}",
                self.dn_name(rmailbx),
                self.dn_name(emailbx)
            ),
            RecordData::Hinfo { ref cpu, ref os } => {
                write!(target, " \"{}\" \"{}\"", cpu, os)
            }
            RecordData::Soa(ref soa) => {
                write!(
                    target,
                    " {} {} {} {} {} {} {}",
                    self.dn_name(soa.mname),
                    self.dn_name(soa.rname),
                    soa.serial,
                    soa.refresh,
                    soa.retry,
                    soa.expire,
                    soa.minimum
                )?;
                for slave in &soa.slaves {
                    write!(target, " slave={}", slave)?;
                }
                Ok(())
            }
            RecordData::Srv {
                priority,
                weight,
                port,
                target: target_dn,
            } => write!(
                target,
                " {} {} {} {}",
                priority,
                weight,
                port,
                self.dn_name(target_dn)
            ),
            RecordData::Key {
                flags,
                protocol,
                algorithm,
                ref key,
            } => write!(
                target,
                " {} {} {} ({} octets)",
                flags,
                protocol,
                algorithm,
                key.len()
            ),
            RecordData::Cert {
                ctype,
                key_tag,
                algorithm,
                ref cert,
            } => write!(
                target,
                " {} {} {} ({} octets)",
                ctype,
                key_tag,
                algorithm,
                cert.len()
            ),
            RecordData::Sig {
                type_covered,
                key_tag,
                ref signer,
                ..
            } => write!(
                target,
                " {} {} {}",
                type_covered,
                key_tag,
                self.dn_name(*signer)
            ),
            RecordData::Null(ref blob) => {
                write!(target, " ({} octets)", blob.len())
            }
            RecordData::Txt(ref chunks) => {
                for chunk in chunks {
                    write!(
                        target,
                        " \"{}\"",
                        String::from_utf8_lossy(chunk)
                    )?;
                }
                Ok(())
            }
        }
    }

    /// Writes the aggregate counters.
    pub(super) fn write_stats<W: io::Write>(
        &self,
        target: &mut W,
    ) -> io::Result<()> {
        let stats = &self.stats;
        writeln!(target, "names-live {}", self.table.live())?;
        writeln!(target, "lookups {}", stats.lookups)?;
        writeln!(target, "hits {}", stats.hits)?;
        writeln!(target, "attaches {}", stats.attaches)?;
        writeln!(target, "merges {}", stats.merges)?;
        writeln!(target, "policy-drops {}", stats.policy_drops)?;
        writeln!(target, "records-evicted {}", stats.evicted_records)?;
        writeln!(target, "names-freed {}", stats.freed_names)?;
        writeln!(target, "sweeps {}", stats.sweeps)
    }
}
