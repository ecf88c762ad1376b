//! Traditional labels for lunar dates (sexagenary year, month and day names)

use std::fmt;

use super::converter::LunarDate;

const STEMS: [&str; 10] = ["甲", "乙", "丙", "丁", "戊", "己", "庚", "辛", "壬", "癸"];
const BRANCHES: [&str; 12] = [
    "子", "丑", "寅", "卯", "辰", "巳", "午", "未", "申", "酉", "戌", "亥",
];
const MONTHS: [&str; 12] = [
    "正", "二", "三", "四", "五", "六", "七", "八", "九", "十", "冬", "臘",
];
const DAYS: [&str; 30] = [
    "初一", "初二", "初三", "初四", "初五", "初六", "初七", "初八", "初九", "初十", "十一", "十二",
    "十三", "十四", "十五", "十六", "十七", "十八", "十九", "二十", "廿一", "廿二", "廿三", "廿四",
    "廿五", "廿六", "廿七", "廿八", "廿九", "三十",
];

impl LunarDate {
    /// Sexagenary year name, e.g. `甲辰年` for 2024
    pub fn year_label(&self) -> String {
        let stem = (self.year - 4).rem_euclid(10) as usize;
        let branch = (self.year - 4).rem_euclid(12) as usize;
        format!("{}{}年", STEMS[stem], BRANCHES[branch])
    }

    /// Month name, prefixed with `閏` for leap months
    pub fn month_label(&self) -> String {
        let name = MONTHS
            .get((self.month as usize).wrapping_sub(1))
            .copied()
            .unwrap_or("?");
        if self.is_leap {
            format!("閏{name}月")
        } else {
            format!("{name}月")
        }
    }

    pub fn day_label(&self) -> &'static str {
        DAYS.get((self.day as usize).wrapping_sub(1))
            .copied()
            .unwrap_or("?")
    }
}

impl fmt::Display for LunarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.year_label(),
            self.month_label(),
            self.day_label()
        )
    }
}
