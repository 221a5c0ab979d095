//! Built-in pages, served when the static directory has no override.

/// Dashboard page.
pub const DEFAULT_INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>PiBirdHouse</title>
    <style>
        body { margin: 0; background: #f4f4f4; font-family: sans-serif; text-align: center; }
        h1 { background: #1b8335; color: white; padding: 10px; margin: 0 0 20px 0; }
        .card { background: white; border-radius: 10px; margin: 15px auto; padding: 15px; max-width: 640px;
                box-shadow: 0 4px 12px rgba(0,0,0,0.1); }
        .alert { color: #c0392b; font-weight: bold; }
        button { background: #1b8335; color: white; border: none; padding: 10px 20px; font-size: 1em;
                 border-radius: 5px; cursor: pointer; margin: 5px; }
        button:hover { background: #14682a; }
        button.danger { background: #c0392b; }
        img { width: 100%; max-width: 640px; }
    </style>
</head>
<body>
    <h1>PiBirdHouse</h1>

    <div class="card">
        <h3>Passages</h3>
        <p>Today: <span id="daily">-</span> &middot; Total: <span id="total">-</span></p>
        <a href="/stats">Statistics</a>
    </div>

    <div class="card">
        <h3>Battery</h3>
        <p><span id="voltage">-</span> V <span id="voltage-alert" class="alert"></span></p>
    </div>

    <div class="card">
        <h3>Host</h3>
        <p>CPU <span id="temperature">-</span> &deg;C &middot; load <span id="load5">-</span></p>
    </div>

    <div class="card">
        <h3>Infrared light</h3>
        <button onclick="toggleIr()">Toggle IR</button> <span id="led">off</span>
        <p><input type="range" min="0" max="100" value="0" id="intensity" onchange="setIntensity(this.value)"></p>
    </div>

    <div class="card">
        <h3>Camera</h3>
        <button onclick="toggleStream()">Toggle stream</button> <span id="video">stopped</span>
        <div id="stream"></div>
    </div>

    <div class="card">
        <button class="danger" onclick="shutdown()">Shut down</button>
    </div>

    <script>
        async function getJson(url) {
            const res = await fetch(url);
            return res.json();
        }

        async function refresh() {
            try {
                const v = await getJson('/voltage');
                document.getElementById('voltage').textContent = v.value.toFixed(2);
                document.getElementById('voltage-alert').textContent = v.alert ? 'LOW' : '';
            } catch (e) {}
            try {
                const s = await getJson('/status');
                document.getElementById('temperature').textContent = s.temperature;
                document.getElementById('load5').textContent = s.load5;
            } catch (e) {}
            try {
                const passages = await getJson('/api/passages');
                const last = passages[passages.length - 1];
                document.getElementById('daily').textContent = last ? last.daily : 0;
                document.getElementById('total').textContent = last ? last.total : 0;
            } catch (e) {}
        }

        async function toggleIr() {
            const res = await (await fetch('/toggle_ir', { method: 'POST' })).json();
            document.getElementById('led').textContent = res.led_on ? 'on' : 'off';
        }

        async function setIntensity(value) {
            const body = new URLSearchParams({ intensity: value });
            await fetch('/set_ir_intensity', { method: 'POST', body });
        }

        async function toggleStream() {
            const res = await (await fetch('/toggle_stream', { method: 'POST' })).json();
            document.getElementById('video').textContent = res.video_running ? 'running' : 'stopped';
            const stream = document.getElementById('stream');
            if (res.video_running) {
                setTimeout(() => {
                    stream.innerHTML = '<img src="http://' + location.hostname + ':8080/stream.mjpg">';
                }, 2000);
            } else {
                stream.innerHTML = '';
            }
        }

        async function shutdown() {
            if (confirm('Shut down the Raspberry Pi?')) {
                const res = await fetch('/shutdown', { method: 'POST' });
                alert(await res.text());
            }
        }

        refresh();
        setInterval(refresh, 5000);
    </script>
</body>
</html>"#;

/// Passage statistics page.
pub const DEFAULT_STATS_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>PiBirdHouse - Statistics</title>
    <style>
        body { margin: 0; background: #f4f4f4; font-family: sans-serif; text-align: center; }
        h1 { background: #1b8335; color: white; padding: 10px; margin: 0 0 20px 0; }
        table { margin: 0 auto; border-collapse: collapse; background: white; }
        th, td { padding: 6px 14px; border-bottom: 1px solid #ddd; }
        th { background: #e8f5e9; }
    </style>
</head>
<body>
    <h1>Passage statistics</h1>
    <p><a href="/">Back to dashboard</a></p>
    <h3>Per day</h3>
    <table id="days"><thead><tr><th>Date</th><th>Passages</th></tr></thead><tbody></tbody></table>
    <h3>Latest passages</h3>
    <table id="latest"><thead><tr><th>Time</th><th>Daily</th><th>Total</th></tr></thead><tbody></tbody></table>
    <script>
        async function load() {
            const passages = await (await fetch('/api/passages')).json();
            const perDay = new Map();
            for (const p of passages) {
                perDay.set(p.datetime.slice(0, 10), p.daily);
            }
            const days = document.querySelector('#days tbody');
            days.innerHTML = '';
            for (const [day, count] of [...perDay.entries()].reverse()) {
                days.insertAdjacentHTML('beforeend', `<tr><td>${day}</td><td>${count}</td></tr>`);
            }
            const latest = document.querySelector('#latest tbody');
            latest.innerHTML = '';
            for (const p of passages.slice(-50).reverse()) {
                latest.insertAdjacentHTML('beforeend',
                    `<tr><td>${p.datetime}</td><td>${p.daily}</td><td>${p.total}</td></tr>`);
            }
        }
        load();
        setInterval(load, 10000);
    </script>
</body>
</html>"#;
