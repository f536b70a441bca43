// ==========================================
// 非营利运营平台 - 捐赠人合并
// ==========================================
// 策略:
// - 主邮箱或备用邮箱命中已有记录 → 逐字段合并后原地更新（不新建）
// - 同文件多行同邮箱 → 折叠为一个写入单元
// - 字段规则: 优先取新值（非空），否则保留旧值
// - 身份字段（主邮箱）保留合并目标的值
// ==========================================

use crate::domain::{DonorRecord, EntityKey, EntityRecord, StoredEntity};
use crate::importer::batch_writer::{UpdateUnit, WriteUnit};
use std::collections::HashMap;

/// 合并计划
#[derive(Debug, Default)]
pub struct DonorMergePlan {
    pub updates: Vec<UpdateUnit>,
    pub inserts: Vec<WriteUnit>,
}

impl DonorMergePlan {
    pub fn row_count(&self) -> usize {
        self.updates.iter().map(|u| u.rows.len()).sum::<usize>()
            + self.inserts.iter().map(|u| u.rows.len()).sum::<usize>()
    }
}

// 合并目标
#[derive(Debug, Clone, Copy)]
enum Target {
    Update(usize),
    Insert(usize),
}

fn prefer<T: Clone>(incoming: &Option<T>, existing: &Option<T>) -> Option<T> {
    incoming.clone().or_else(|| existing.clone())
}

fn prefer_text(incoming: &Option<String>, existing: &Option<String>) -> Option<String> {
    match incoming {
        Some(v) if !v.trim().is_empty() => Some(v.clone()),
        _ => existing.clone(),
    }
}

/// 逐字段合并（优先新值，否则保留旧值）
pub fn merge_donor(existing: &DonorRecord, incoming: &DonorRecord) -> DonorRecord {
    let name = if incoming.name.trim().is_empty() {
        existing.name.clone()
    } else {
        incoming.name.clone()
    };

    let email = existing.email.clone();
    let primary = EntityKey::normalized(&email);

    // 新行主邮箱与目标不同（经由备用邮箱命中）时，作为备用邮箱保留
    let is_other = |value: &String| {
        let key = EntityKey::normalized(value);
        !key.is_empty() && key != primary
    };
    let incoming_alt = incoming
        .alt_email
        .iter()
        .chain(std::iter::once(&incoming.email))
        .find(|v| is_other(v))
        .cloned();
    let alt_email = incoming_alt.or_else(|| existing.alt_email.clone().filter(is_other));

    DonorRecord {
        name,
        email,
        alt_email,
        phone: prefer_text(&incoming.phone, &existing.phone),
        address: prefer_text(&incoming.address, &existing.address),
        city: prefer_text(&incoming.city, &existing.city),
        state: prefer_text(&incoming.state, &existing.state),
        postal_code: prefer_text(&incoming.postal_code, &existing.postal_code),
        country: prefer_text(&incoming.country, &existing.country),
        donor_type: prefer_text(&incoming.donor_type, &existing.donor_type),
        first_donation_date: prefer(&incoming.first_donation_date, &existing.first_donation_date),
        last_donation_date: prefer(&incoming.last_donation_date, &existing.last_donation_date),
        total_donated: prefer(&incoming.total_donated, &existing.total_donated),
        is_recurring: prefer(&incoming.is_recurring, &existing.is_recurring),
        email_opt_in: prefer(&incoming.email_opt_in, &existing.email_opt_in),
        notes: prefer_text(&incoming.notes, &existing.notes),
    }
}

fn donor_of(record: &EntityRecord) -> Option<&DonorRecord> {
    match record {
        EntityRecord::Donor(d) => Some(d),
        _ => None,
    }
}

/// 生成合并计划
///
/// # 参数
/// - rows: (源行号, 捐赠人记录)，按源文件顺序
/// - existing: 批量查询命中的已有捐赠人
pub fn plan_donor_merge(rows: Vec<(usize, DonorRecord)>, existing: &[StoredEntity]) -> DonorMergePlan {
    let mut plan = DonorMergePlan::default();
    let mut index: HashMap<EntityKey, Target> = HashMap::new();
    // 已有记录按全部自然键索引；只有被行命中的已有记录才生成更新单元
    let mut existing_by_key: HashMap<EntityKey, &StoredEntity> = HashMap::new();
    for entity in existing {
        for key in entity.record.natural_keys() {
            existing_by_key.entry(key).or_insert(entity);
        }
    }

    for (row_number, donor) in rows {
        let incoming = EntityRecord::Donor(donor);
        let keys = incoming.natural_keys();

        let mut target = keys.iter().find_map(|k| index.get(k).copied());
        if target.is_none() {
            if let Some(entity) = keys.iter().find_map(|k| existing_by_key.get(k).copied()) {
                // 同一已有记录可能已由另一个键登记
                let slot = match plan.updates.iter().position(|u| u.id == entity.id) {
                    Some(slot) => slot,
                    None => {
                        plan.updates.push(UpdateUnit {
                            id: entity.id.clone(),
                            record: entity.record.clone(),
                            rows: Vec::new(),
                        });
                        plan.updates.len() - 1
                    }
                };
                target = Some(Target::Update(slot));
            }
        }

        let (target, unit_keys) = match target {
            Some(Target::Update(slot)) => {
                let unit = &mut plan.updates[slot];
                if let (Some(base), Some(new)) = (donor_of(&unit.record), donor_of(&incoming)) {
                    unit.record = EntityRecord::Donor(merge_donor(base, new));
                }
                unit.rows.push(row_number);
                (Target::Update(slot), unit.record.natural_keys())
            }
            Some(Target::Insert(slot)) => {
                let unit = &mut plan.inserts[slot];
                if let (Some(base), Some(new)) = (donor_of(&unit.record), donor_of(&incoming)) {
                    unit.record = EntityRecord::Donor(merge_donor(base, new));
                }
                unit.rows.push(row_number);
                (Target::Insert(slot), unit.record.natural_keys())
            }
            None => {
                plan.inserts.push(WriteUnit {
                    record: incoming,
                    rows: vec![row_number],
                });
                let unit = &plan.inserts[plan.inserts.len() - 1];
                (Target::Insert(plan.inserts.len() - 1), unit.record.natural_keys())
            }
        };

        // 合并后新增的键（如新备用邮箱）也指向同一单元
        for key in unit_keys.into_iter().chain(keys) {
            index.entry(key).or_insert(target);
        }
    }

    plan
}
