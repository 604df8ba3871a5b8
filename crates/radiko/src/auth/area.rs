//! Prefecture table used to spoof the auth2 geolocation.

/// Area used when a requested code is not in the table.
pub const FALLBACK_AREA: &str = "JP13";

/// Accuracy (metres) reported alongside the spoofed coordinates.
pub const LOCATION_ACCURACY: u32 = 130;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub id: &'static str,
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

impl Area {
    /// Value of `X-Radiko-Location`: `latitude,longitude,accuracy`.
    pub fn location_header(&self) -> String {
        format!("{},{},{}", self.latitude, self.longitude, LOCATION_ACCURACY)
    }
}

macro_rules! areas {
    ($(($id:literal, $name:literal, $lat:literal, $lng:literal)),* $(,)?) => {
        &[$(Area { id: $id, name: $name, latitude: $lat, longitude: $lng }),*]
    };
}

pub const AREAS: &[Area] = areas![
    ("JP01", "北海道", 43.064615, 141.346807),
    ("JP02", "青森", 40.824308, 140.739998),
    ("JP03", "岩手", 39.703619, 141.152684),
    ("JP04", "宮城", 38.268837, 140.8721),
    ("JP05", "秋田", 39.718614, 140.102364),
    ("JP06", "山形", 38.240436, 140.363633),
    ("JP07", "福島", 37.750299, 140.467551),
    ("JP08", "茨城", 36.341811, 140.446793),
    ("JP09", "栃木", 36.565725, 139.883565),
    ("JP10", "群馬", 36.390668, 139.060406),
    ("JP11", "埼玉", 35.856999, 139.648849),
    ("JP12", "千葉", 35.605057, 140.123306),
    ("JP13", "東京", 35.689488, 139.691706),
    ("JP14", "神奈川", 35.447507, 139.642345),
    ("JP15", "新潟", 37.902552, 139.023095),
    ("JP16", "富山", 36.695291, 137.211338),
    ("JP17", "石川", 36.594682, 136.625573),
    ("JP18", "福井", 36.065178, 136.221527),
    ("JP19", "山梨", 35.664158, 138.568449),
    ("JP20", "長野", 36.651299, 138.180956),
    ("JP21", "岐阜", 35.391227, 136.722291),
    ("JP22", "静岡", 34.97712, 138.383084),
    ("JP23", "愛知", 35.180188, 136.906565),
    ("JP24", "三重", 34.730283, 136.508588),
    ("JP25", "滋賀", 35.004531, 135.86859),
    ("JP26", "京都", 35.021247, 135.755597),
    ("JP27", "大阪", 34.686297, 135.519661),
    ("JP28", "兵庫", 34.691269, 135.183071),
    ("JP29", "奈良", 34.685334, 135.832742),
    ("JP30", "和歌山", 34.225987, 135.167509),
    ("JP31", "鳥取", 35.503891, 134.237736),
    ("JP32", "島根", 35.472295, 133.0505),
    ("JP33", "岡山", 34.661751, 133.934406),
    ("JP34", "広島", 34.39656, 132.459622),
    ("JP35", "山口", 34.185956, 131.470649),
    ("JP36", "徳島", 34.065718, 134.55936),
    ("JP37", "香川", 34.340149, 134.043444),
    ("JP38", "愛媛", 33.841624, 132.765681),
    ("JP39", "高知", 33.559706, 133.531079),
    ("JP40", "福岡", 33.606576, 130.418297),
    ("JP41", "佐賀", 33.249442, 130.299794),
    ("JP42", "長崎", 32.744839, 129.873756),
    ("JP43", "熊本", 32.789827, 130.741667),
    ("JP44", "大分", 33.238172, 131.612619),
    ("JP45", "宮崎", 31.911096, 131.423893),
    ("JP46", "鹿児島", 31.560146, 130.557978),
    ("JP47", "沖縄", 26.2124, 127.680932),
];

pub fn find_area(id: &str) -> Option<&'static Area> {
    AREAS.iter().find(|a| a.id.eq_ignore_ascii_case(id))
}

pub fn is_known_area(id: &str) -> bool {
    find_area(id).is_some()
}

/// Looks up `id`, falling back to Tokyo for unknown codes.
pub fn area_or_fallback(id: &str) -> &'static Area {
    find_area(id)
        .or_else(|| find_area(FALLBACK_AREA))
        .unwrap_or(&AREAS[12])
}
