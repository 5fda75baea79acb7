use ntex_h2_session::hpack::Header;

pub fn build_large_headers() -> Vec<Header> {
    vec![
        Header::new("one", "hello"),
        Header::new("two", build_large_string('2', 4 * 1024)),
        Header::new("three", "three"),
        Header::new("four", build_large_string('4', 4 * 1024)),
        Header::new("five", "five"),
        Header::new("six", build_large_string('6', 4 * 1024)),
        Header::new("seven", "seven"),
        Header::new("eight", build_large_string('8', 4 * 1024)),
        Header::new("nine", "nine"),
        Header::new("ten", build_large_string('0', 4 * 1024)),
    ]
}

fn build_large_string(ch: char, len: usize) -> String {
    let mut ret = String::new();

    for _ in 0..len {
        ret.push(ch);
    }

    ret
}
