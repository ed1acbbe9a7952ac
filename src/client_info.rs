use rocket::request::{FromRequest, Outcome, Request};

/// Provenance of the current request: client address, user agent and referrer.
/// The address is taken from proxy headers first, in this order:
///   1. CF-Connecting-IP
///   2. True-Client-IP
///   3. X-Real-IP
///   4. X-Forwarded-For (leftmost entry)
///   5. the socket peer address
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    /// Host of the Referer header, or the raw value when it is not a URL.
    pub referrer: Option<String>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientInfo {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = request.headers();

        let forwarded = ["CF-Connecting-IP", "True-Client-IP", "X-Real-IP"]
            .iter()
            .filter_map(|h| headers.get_one(h))
            .chain(
                headers
                    .get_one("X-Forwarded-For")
                    .and_then(|v| v.split(',').next()),
            )
            .map(str::trim)
            .find(|ip| !ip.is_empty())
            .map(str::to_string);

        let ip = forwarded.or_else(|| request.client_ip().map(|ip| ip.to_string()));

        let user_agent = headers
            .get_one("User-Agent")
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .map(str::to_string);

        let referrer = headers
            .get_one("Referer")
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(extract_domain);

        Outcome::Success(ClientInfo {
            ip,
            user_agent,
            referrer,
        })
    }
}

/// Device class, browser and OS guessed from a user-agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub device_type: &'static str,
    pub browser: &'static str,
    pub os: &'static str,
}

pub fn parse_user_agent(ua: &str) -> Device {
    let device_type = if ua.contains("iPad") || ua.contains("Tablet") {
        "tablet"
    } else if ua.contains("Mobile") || ua.contains("Android") || ua.contains("iPhone") {
        "mobile"
    } else {
        "desktop"
    };

    let browser = if ua.contains("Firefox") {
        "Firefox"
    } else if ua.contains("Edg/") {
        "Edge"
    } else if ua.contains("OPR") || ua.contains("Opera") {
        "Opera"
    } else if ua.contains("Chrome") {
        "Chrome"
    } else if ua.contains("Safari") {
        "Safari"
    } else {
        "Other"
    };

    let os = if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("iPhone") || ua.contains("iPad") {
        "iOS"
    } else if ua.contains("Mac OS X") || ua.contains("Macintosh") {
        "macOS"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        "Other"
    };

    Device {
        device_type,
        browser,
        os,
    }
}

pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| url.to_string())
}
