//! Landing page served at the proxy root.

/// Home page with the URL entry form. Submissions normalize bare host
/// names to `https://` before navigating to the proxy endpoint.
pub const HOME_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Periscope</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
            margin: 0;
            background: linear-gradient(135deg, #1f4037 0%, #2c5364 100%);
            color: white;
        }
        .container {
            text-align: center;
            padding: 2rem;
            max-width: 560px;
            width: 100%;
        }
        .scope {
            font-size: 4rem;
            margin-bottom: 1rem;
        }
        h1 {
            margin: 0 0 1rem 0;
            font-size: 2rem;
        }
        p {
            margin: 0.5rem 0;
            opacity: 0.9;
        }
        form {
            display: flex;
            gap: 0.5rem;
            margin-top: 1.5rem;
        }
        input {
            flex: 1;
            padding: 0.75rem 1rem;
            border: none;
            border-radius: 8px;
            font-size: 1rem;
        }
        button {
            padding: 0.75rem 1.5rem;
            border: none;
            border-radius: 8px;
            font-size: 1rem;
            background: rgba(255,255,255,0.25);
            color: white;
            cursor: pointer;
        }
        button:hover {
            background: rgba(255,255,255,0.4);
        }
    </style>
</head>
<body>
    <div class="container">
        <div class="scope">🔭</div>
        <h1>Periscope</h1>
        <p>Enter a URL to browse it through the proxy.</p>
        <form id="go">
            <input id="url" type="text" placeholder="https://example.com" autocomplete="off" autofocus>
            <button type="submit">Browse</button>
        </form>
    </div>
    <script>
        document.getElementById("go").addEventListener("submit", function (event) {
            event.preventDefault();
            var value = document.getElementById("url").value.trim();
            if (!value) return;
            if (!/^https?:\/\//i.test(value)) {
                value = "https://" + value;
            }
            window.location.href = "/p?u=" + encodeURIComponent(value);
        });
    </script>
</body>
</html>"#;
